use serde::{Deserialize, Serialize};

/// Response wrapper shared by every endpoint, reads and mutations alike.
/// Clients treat `data` as authoritative and refetch on broadcast signals.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_success_flag() {
        let body = serde_json::to_value(ApiResponse::ok("Create board success", 7)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Create board success");
        assert_eq!(body["data"], 7);
    }

    #[test]
    fn read_payloads_nest_under_data() {
        let detail = serde_json::json!({
            "id": "3d9f8a54-1f0f-4f6c-9a74-2a4f2c1b9e01",
            "title": "roadmap",
            "columns": [],
        });
        let body = serde_json::to_value(ApiResponse::ok("Board fetched", detail)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["title"], "roadmap");
        assert!(body["data"]["columns"].is_array());
    }
}
