use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    // request-level failures with user-visible messages
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Login to access this page")]
    MissingCaller,
    #[error("Unauthorized")]
    Forbidden,

    // object store protocol violations
    #[error("failed to initiate multipart upload: {0}")]
    ObjectsFailedToInitiateUpload(&'static str),
    #[error("failed to complete multipart upload: {0}")]
    ObjectsFailedToCompleteUpload(&'static str),
    #[error("multipart upload has no parts")]
    ObjectsUploadHasNoParts,
    #[error("missing e_tag for part {0}")]
    ObjectsMissingPartETag(i32),
    #[error("unknown multipart upload: {0}")]
    ObjectsUnknownUpload(String),

    #[error("aws sdk put object error")]
    AWSSDKPutObjectError(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::put_object::PutObjectError>,
    ),
    #[error("aws sdk delete object error")]
    AWSSDKDeleteObjectError(
        #[from]
        aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::delete_object::DeleteObjectError>,
    ),
    #[error("aws sdk delete objects error")]
    AWSSDKDeleteObjectsError(
        #[from]
        aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::delete_objects::DeleteObjectsError>,
    ),
    #[error("aws sdk list objects error")]
    AWSSDKListObjectsV2Error(
        #[from]
        aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error>,
    ),
    #[error("aws sdk create multipart upload error")]
    AWSSDKCreateMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::create_multipart_upload::CreateMultipartUploadError,
        >,
    ),
    #[error("aws sdk upload part error")]
    AWSSDKUploadPartError(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::upload_part::UploadPartError>,
    ),
    #[error("aws sdk list parts error")]
    AWSSDKListPartsError(
        #[from] aws_sdk_s3::error::SdkError<aws_sdk_s3::operation::list_parts::ListPartsError>,
    ),
    #[error("aws sdk complete multipart upload error")]
    AWSSDKCompleteMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::complete_multipart_upload::CompleteMultipartUploadError,
        >,
    ),
    #[error("aws sdk abort multipart upload error")]
    AWSSDKAbortMultipartUploadError(
        #[from]
        aws_sdk_s3::error::SdkError<
            aws_sdk_s3::operation::abort_multipart_upload::AbortMultipartUploadError,
        >,
    ),
    #[error("aws sdk credentials error")]
    AWSSDKCredentialsError(#[from] aws_credential_types::provider::error::CredentialsError),

    // cdn signing
    #[error("pkcs1 error: {0}")]
    Pkcs1Error(#[from] rsa::pkcs1::Error),
    #[error("pkcs8 error: {0}")]
    Pkcs8Error(#[from] rsa::pkcs8::Error),
    #[error("signature error: {0}")]
    SignatureError(#[from] rsa::signature::Error),

    // infrastructure
    #[error("sqlx error")]
    SQLXError(#[from] sqlx::Error),
    #[error("sqlx migration error")]
    SQLXMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sea-query error")]
    SeaQueryError(#[from] sea_query::error::Error),
    #[error("config deserialization error")]
    ConfigError(#[from] serde_yaml::Error),
    #[error("io error")]
    IOError(#[from] std::io::Error),
    #[error("http error")]
    HTTPError(#[from] http::Error),
    #[error("http invalid header value")]
    HTTPInvalidHeaderValue(#[from] http::header::InvalidHeaderValue),
    #[error("hyper error")]
    HyperError(#[from] hyper::Error),
    #[error("address parse error")]
    AddrParseError(#[from] std::net::AddrParseError),
    #[error("serde_json error")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("multipart form error: {0}")]
    MultipartError(#[from] axum::extract::multipart::MultipartError),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(_) => error_response(StatusCode::BAD_REQUEST, format!("{}", self)),
            Error::MultipartError(_) => {
                error_response(StatusCode::BAD_REQUEST, format!("{}", self))
            }
            Error::NotFound(_) => error_response(StatusCode::NOT_FOUND, format!("{}", self)),
            Error::MissingCaller => {
                error_response(StatusCode::UNAUTHORIZED, format!("{}", self))
            }
            Error::Forbidden => error_response(StatusCode::FORBIDDEN, format!("{}", self)),
            e => {
                tracing::warn!("internal error: {e:?}");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("internal server error"),
                )
            }
        }
    }
}

#[inline]
fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        axum::Json(serde_json::json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}
