use rama::telemetry::tracing;

/// Parsed query and form parameters of a request.
///
/// Keys can occur multiple times, lookups return the first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Parse the urlencoded form body and query string,
    /// with form values taking precedence over query values.
    pub fn parse(form: Option<&str>, query: Option<&str>) -> Self {
        let mut pairs = Vec::new();
        for (source, input) in [("form", form), ("query", query)] {
            let Some(input) = input.filter(|s| !s.is_empty()) else {
                continue;
            };
            match serde_html_form::from_str::<Vec<(String, String)>>(input) {
                Ok(parsed) => pairs.extend(parsed),
                Err(err) => {
                    tracing::debug!("ignore malformed {source} parameters {input:?}: {err}");
                }
            }
        }
        Self(pairs)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// Requested lag, `lag` wins over the short `t` form.
    pub fn lag(&self) -> Option<&str> {
        self.get("lag")
            .filter(|s| !s.is_empty())
            .or_else(|| self.get("t"))
    }

    /// Requested data size.
    pub fn size(&self) -> Option<&str> {
        self.get("s")
    }
}
