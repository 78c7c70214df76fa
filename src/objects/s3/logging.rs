//! Debug-level logging of every request the S3 client puts on the wire.

#[derive(Debug)]
pub(crate) struct RequestLogger;

impl aws_sdk_s3::config::Interceptor for RequestLogger {
    fn name(&self) -> &'static str {
        "RequestLogger"
    }

    fn read_after_serialization(
        &self,
        context: &aws_sdk_s3::config::interceptors::BeforeTransmitInterceptorContextRef<'_>,
        _runtime_components: &aws_sdk_s3::config::RuntimeComponents,
        _cfg: &mut aws_sdk_s3::config::ConfigBag,
    ) -> Result<(), aws_sdk_s3::error::BoxError> {
        let request = context.request();
        tracing::debug!("s3 request: {} {}", request.method(), request.uri());
        Ok(())
    }

    fn read_after_deserialization(
        &self,
        context: &aws_sdk_s3::config::interceptors::AfterDeserializationInterceptorContextRef<'_>,
        _runtime_components: &aws_sdk_s3::config::RuntimeComponents,
        _cfg: &mut aws_sdk_s3::config::ConfigBag,
    ) -> Result<(), aws_sdk_s3::error::BoxError> {
        let response = context.response();
        tracing::debug!("s3 response: {}", response.status());
        Ok(())
    }
}
