use std::collections::BTreeMap;

use tera::{Context, Tera};

use crate::data::{FetchRequest, Source};
use crate::error::Result;

/// Render the templated fields of `request` against `context`.
///
/// The endpoint, object container and key, and every query parameter and
/// header value go through Tera. Strings without template markers are copied
/// as-is. The destination is never rendered.
///
/// # Examples
///
/// ```
/// use ferry_fetch::FetchRequest;
///
/// let mut context = tera::Context::new();
/// context.insert("ds", "2020-05-01");
///
/// let rendered = FetchRequest::http("/export/{{ ds }}", "/tmp/export.csv")
///     .param("since", "{{ ds }}")
///     .render(&context)
///     .unwrap();
/// assert_eq!(rendered.params()["since"], "2020-05-01");
/// ```
pub fn render(request: &FetchRequest, context: &Context) -> Result<FetchRequest> {
    let text = |input: &str| -> Result<String> {
        if input.contains("{{") || input.contains("{%") {
            Ok(Tera::one_off(input, context, false)?)
        } else {
            Ok(input.to_string())
        }
    };

    let source = match request.source() {
        Source::Http { endpoint } => Source::Http {
            endpoint: text(endpoint)?,
        },
        Source::Object { container, key } => Source::Object {
            container: text(container)?,
            key:       text(key)?,
        },
    };

    let render_map = |map: &BTreeMap<String, String>| -> Result<BTreeMap<String, String>> {
        map.iter()
            .map(|(k, v)| -> Result<(String, String)> { Ok((k.clone(), text(v)?)) })
            .collect()
    };

    Ok(FetchRequest::new(source, request.destination())
        .extend_params(render_map(request.params())?)
        .extend_headers(render_map(request.headers())?))
}
