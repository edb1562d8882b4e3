use super::{HandlerOutcome, optional, require_string, store_output};
use crate::browser::Browser;
use crate::context::ExecutionContext;
use std::collections::BTreeMap;
use tabweave_common::protocol::{Action, binding};
use tabweave_common::value::Value;

const DEFAULT_METHOD: &str = "GET";

/// Coerce a bound `Headers` value into a name -> value map. Accepts a JSON
/// object; non-string entries are rendered as JSON text.
fn headers_from_value(value: &Value) -> Option<BTreeMap<String, String>> {
    let Value::Json(serde_json::Value::Object(map)) = value else {
        return None;
    };
    let mut headers = BTreeMap::new();
    for (name, entry) in map {
        let rendered = match entry.as_str() {
            Some(s) => s.to_string(),
            None => entry.to_string(),
        };
        headers.insert(name.clone(), rendered);
    }
    Some(headers)
}

/// HttpRequest: issue a request from the privileged context. `Url` is
/// mandatory; `Method` defaults to GET and `Headers` to an empty map, each
/// absence logged as a Warning.
pub async fn http_request<B: Browser + ?Sized>(
    action: &Action,
    ctx: &mut ExecutionContext,
    browser: &mut B,
) -> HandlerOutcome {
    let mut out = HandlerOutcome::new();
    let Some(url) = require_string(action, ctx, binding::URL, &mut out) else {
        return out;
    };
    let url = url.to_string();

    let method = match optional(action, ctx, binding::METHOD) {
        Some(value) => match value.as_str() {
            Some(method) => {
                out.info(format!("Method: {method}"));
                method.to_string()
            }
            None => {
                out.warning(format!(
                    "Method input is not a string (got {}), defaulting to {DEFAULT_METHOD}",
                    value.type_name()
                ));
                DEFAULT_METHOD.to_string()
            }
        },
        None => {
            out.warning("Method input not defined! (defaulting to GET)");
            DEFAULT_METHOD.to_string()
        }
    };

    let headers = match optional(action, ctx, binding::HEADERS) {
        Some(value) => match headers_from_value(value) {
            Some(headers) => {
                out.info(format!("Headers: {headers:?}"));
                headers
            }
            None => {
                out.warning(format!(
                    "Headers input is not an object (got {}), defaulting to empty",
                    value.type_name()
                ));
                BTreeMap::new()
            }
        },
        None => {
            out.warning("Headers input not defined! (defaulting to empty object)");
            BTreeMap::new()
        }
    };

    out.info(format!("Sending {method} request to {url}"));
    let response = match browser.fetch(&method, &url, &headers).await {
        Ok(response) => response,
        Err(err) => {
            out.fail(format!("Request to {url} failed: {err}"));
            return out;
        }
    };

    store_output(
        action,
        ctx,
        &mut out,
        binding::RESPONSE,
        Value::Response(response),
    );
    out
}
