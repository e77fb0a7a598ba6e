use axum::body::Bytes;
use std::time::Duration;
use uuid::Uuid;
use zoning_portal::storage::{MockStorageService, S3StorageClient, StorageService, sanitize_key};

const TEN_MINUTES: Duration = Duration::from_secs(600);

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "applications/ZA-2026-0000ABCD/businessPermit/permit.pdf";
        let url = mock
            .presign_put(key, "application/pdf", Some(2048), TEN_MINUTES)
            .await
            .unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains(key));
        assert!(url.contains("content-length=2048"));
        assert!(url.contains("expires=600"));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let presign = mock
            .presign_put("a.pdf", "application/pdf", None, TEN_MINUTES)
            .await;
        assert!(presign.is_err());

        let put = mock
            .put_object("a.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await;
        assert!(put.is_err());
        assert!(mock.stored_objects().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock
            .presign_put("../../etc/passwd", "image/png", None, TEN_MINUTES)
            .await
            .unwrap();

        assert!(!url.contains(".."));
        assert!(url.contains("etc/passwd"));
    }

    #[tokio::test]
    async fn test_mock_records_each_write() {
        let mock = MockStorageService::new();
        let url = mock
            .put_object("applications/unassigned/sitePlan/x.png", "image/png", Bytes::from(vec![0u8; 16]))
            .await
            .unwrap();

        assert_eq!(url, mock.object_url("applications/unassigned/sitePlan/x.png"));
        let stored = mock.stored_objects().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content_type, "image/png");
        assert_eq!(stored[0].size, 16);
    }

    #[test]
    fn test_sanitize_key_drops_traversal_segments() {
        assert_eq!(sanitize_key("a//./b/../c"), "a/b/c");
        assert_eq!(sanitize_key("/leading/slash/"), "leading/slash");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    async fn client() -> S3StorageClient {
        S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
            "http://cdn.localhost:9000/",
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn test_s3_client_creation() {
        // Construction performs no network calls.
        let _client = client().await;
    }

    #[tokio::test]
    async fn test_s3_presigned_url_format() {
        let client = client().await;

        let key = format!("applications/unassigned/locationMap/{}.pdf", Uuid::new_v4());
        let url = client
            .presign_put(&key, "application/pdf", Some(1024), TEN_MINUTES)
            .await
            .unwrap();

        assert!(url.contains("localhost:9000"));
        assert!(url.contains(&key));
        assert!(url.contains("X-Amz-Expires=600"));
    }

    #[tokio::test]
    async fn test_s3_object_url_uses_public_base() {
        let client = client().await;
        assert_eq!(
            client.object_url("applications/ZA-2026-00000001/sitePlan/a.png"),
            "http://cdn.localhost:9000/testbucket/applications/ZA-2026-00000001/sitePlan/a.png"
        );
    }
}
