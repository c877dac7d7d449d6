use std::collections::BTreeMap;

use crate::error::FormError;

/// Largest url-encoded body that is parsed for form params.
pub const MAX_FORM_BODY: usize = 10 << 20;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// The request being served when an error happened, as supplied by the
/// application. Build one directly or convert it from an [`http::Request`].
#[derive(Clone, Debug, typed_builder::TypedBuilder)]
pub struct Request {
    #[builder(default = "GET".to_owned(), setter(into))]
    pub method: String,

    /// request target, absolute or origin-form (`/path?query`)
    #[builder(setter(into))]
    pub url: String,

    #[builder(default = "HTTP/1.1".to_owned(), setter(into))]
    pub protocol: String,

    #[builder(default)]
    pub headers: Vec<(String, String)>,

    #[builder(default, setter(strip_option, into))]
    pub body: Option<Vec<u8>>,
}

impl<B: AsRef<[u8]>> From<&http::Request<B>> for Request {
    fn from(request: &http::Request<B>) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = request.body().as_ref();

        Self {
            method: request.method().as_str().to_owned(),
            url: request.uri().to_string(),
            protocol: format!("{:?}", request.version()),
            headers,
            body: if body.is_empty() {
                None
            } else {
                Some(body.to_vec())
            },
        }
    }
}

impl Request {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn query(&self) -> &str {
        let target = match self.url.find('#') {
            Some(fragment) => &self.url[..fragment],
            None => &self.url,
        };
        match target.find('?') {
            Some(start) => &target[start + 1..],
            None => "",
        }
    }

    fn has_form_body(&self) -> bool {
        let method = self.method.to_ascii_uppercase();
        matches!(method.as_str(), "POST" | "PUT" | "PATCH")
            && self
                .header("content-type")
                .map(|ct| ct.trim().to_ascii_lowercase().starts_with(FORM_CONTENT_TYPE))
                .unwrap_or(false)
    }
}

/// Request data attached to a notice. Never mutated once parsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub url: String,
    pub method: String,
    pub protocol: String,
    pub form_params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    /// display copies of the non-empty params, keyed `?name`
    pub pretty_params: BTreeMap<String, String>,
}

impl RequestContext {
    /// Parses the form data of `request` (url-encoded body first, then the
    /// query string; the first value of a repeated key wins).
    pub fn parse(request: &Request, pretty_params: bool) -> Result<Self, FormError> {
        let mut form_params = BTreeMap::new();

        if request.has_form_body() {
            let body = request.body.as_deref().unwrap_or_default();
            if body.len() > MAX_FORM_BODY {
                return Err(FormError::TooLarge {
                    len: body.len(),
                    limit: MAX_FORM_BODY,
                });
            }
            let body = std::str::from_utf8(body)?;
            collect_pairs(&mut form_params, body)?;
        }
        collect_pairs(&mut form_params, request.query())?;

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in &request.headers {
            headers
                .entry(name.clone())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }

        let pretty_params = if pretty_params {
            form_params
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| (format!("?{key}"), value.clone()))
                .collect()
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            url: request.url.clone(),
            method: request.method.clone(),
            protocol: request.protocol.clone(),
            form_params,
            headers,
            pretty_params,
        })
    }
}

fn collect_pairs(target: &mut BTreeMap<String, String>, encoded: &str) -> Result<(), FormError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(encoded)?;
    for (key, value) in pairs {
        target.entry(key).or_insert(value);
    }
    Ok(())
}
