use async_trait::async_trait;
use parts_catalog::compat_api::{CompatApiError, CompatDescriptor, CompatSource};
use reqwest::StatusCode;

/// In-memory compatibility source returning canned descriptors
pub struct MockCompatSource {
    descriptors: Vec<CompatDescriptor>,
    fail: bool,
}

impl MockCompatSource {
    pub fn new(descriptors: Vec<CompatDescriptor>) -> Self {
        MockCompatSource {
            descriptors,
            fail: false,
        }
    }

    /// A source whose every fetch fails with a service error
    pub fn failing() -> Self {
        MockCompatSource {
            descriptors: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl CompatSource for MockCompatSource {
    async fn fetch_models(
        &self,
        _model_ids: &[i64],
    ) -> Result<Vec<CompatDescriptor>, CompatApiError> {
        if self.fail {
            return Err(CompatApiError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        Ok(self.descriptors.clone())
    }
}
