use http::StatusCode;
use hyper::Response;

use crate::control::LiveConfig;
use crate::proxy::http_result::HttpResult;
use crate::proxy::synthetic_response::{json_response, RespBody};

/// `/stats`: every tracked client and its available tokens, as a JSON array
pub fn stats_response(live: &LiveConfig) -> HttpResult<Response<RespBody>> {
    let stats = live.limiter().stats();
    json_response(StatusCode::OK, &stats)
}
