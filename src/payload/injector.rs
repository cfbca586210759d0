use thiserror::Error;
use url::Url;

use crate::http::ProbeRequest;
use crate::models::HttpMethod;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

pub struct Injector;

impl Injector {
    /// Place `payload` into `param`.
    ///
    /// GET rewrites the query string: the injected key is overwritten in place
    /// (or appended) and every other pair is kept in its original order. POST
    /// leaves the URL alone and sends `{param: payload}` as the only form field.
    pub fn inject_parameter(
        url: &str,
        param: &str,
        payload: &str,
        method: HttpMethod,
    ) -> Result<ProbeRequest, InjectError> {
        match method {
            HttpMethod::Get => Ok(ProbeRequest {
                method,
                url: Self::inject_query(url, param, payload)?,
                form: None,
            }),
            HttpMethod::Post => Ok(ProbeRequest {
                method,
                url: url.to_string(),
                form: Some(vec![(param.to_string(), payload.to_string())]),
            }),
        }
    }

    fn inject_query(url: &str, param: &str, payload: &str) -> Result<String, InjectError> {
        let mut parsed = Url::parse(url).map_err(|source| InjectError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut injected = false;

        for (key, value) in parsed.query_pairs() {
            if key == param {
                if !injected {
                    pairs.push((key.into_owned(), payload.to_string()));
                    injected = true;
                }
            } else {
                pairs.push((key.into_owned(), value.into_owned()));
            }
        }

        if !injected {
            pairs.push((param.to_string(), payload.to_string()));
        }

        parsed.set_query(None);
        parsed.query_pairs_mut().extend_pairs(pairs.iter());

        Ok(parsed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_of(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_get_overwrites_param() {
        let req = Injector::inject_parameter(
            "http://shop.test/item.php?cat=2&id=1&sort=asc",
            "id",
            "' ORDER BY 1-- -",
            HttpMethod::Get,
        )
        .unwrap();

        assert!(req.form.is_none());
        assert!(req.url.starts_with("http://shop.test/item.php?"));
        assert_eq!(
            query_of(&req.url),
            vec![
                ("cat".to_string(), "2".to_string()),
                ("id".to_string(), "' ORDER BY 1-- -".to_string()),
                ("sort".to_string(), "asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_get_payload_is_encoded() {
        let req =
            Injector::inject_parameter("http://t/a?id=1", "id", "' UNION SELECT 1-- -", HttpMethod::Get)
                .unwrap();
        assert!(!req.url.contains(' '));
        assert!(!req.url.contains('\''));
    }

    #[test]
    fn test_get_appends_missing_param_and_keeps_blank_values() {
        let req = Injector::inject_parameter("http://t/a?debug=&x=1", "id", "1", HttpMethod::Get)
            .unwrap();
        assert_eq!(
            query_of(&req.url),
            vec![
                ("debug".to_string(), String::new()),
                ("x".to_string(), "1".to_string()),
                ("id".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_get_collapses_repeated_param() {
        let req = Injector::inject_parameter("http://t/a?id=1&id=2", "id", "p", HttpMethod::Get)
            .unwrap();
        assert_eq!(query_of(&req.url), vec![("id".to_string(), "p".to_string())]);
    }

    #[test]
    fn test_post_keeps_url_and_builds_form() {
        let req = Injector::inject_parameter("http://t/login?next=/", "user", "' OR 1-- -", HttpMethod::Post)
            .unwrap();
        assert_eq!(req.url, "http://t/login?next=/");
        assert_eq!(
            req.form,
            Some(vec![("user".to_string(), "' OR 1-- -".to_string())])
        );
    }

    #[test]
    fn test_invalid_url() {
        let err = Injector::inject_parameter("not a url", "id", "1", HttpMethod::Get).unwrap_err();
        assert!(matches!(err, InjectError::InvalidUrl { .. }));
    }
}
