//! 请求 / 响应值类型：意图识别请求的校验与编码、响应的解码。
//!
//! Value types created per call and discarded afterwards.

pub mod request;
pub mod response;

pub use request::DetectIntentRequest;
pub use response::DetectIntentResponse;
