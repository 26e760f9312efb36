/// Raw values of a `/config` request.
///
/// Values are kept as received. Parsing and validation happen in
/// [`LiveConfig::apply`](super::LiveConfig::apply), which falls back to the
/// previous value on any malformed input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub delay: Option<String>,
    pub limit: Option<String>,
    pub duration: Option<String>,
    pub percentage: Option<String>,
}

impl ConfigOverrides {
    /// Read `DELAY`, `LIMIT`, `DURATION` and `PERCENT`/`PERCENTAGE` from a query string.
    ///
    /// Names and values are percent-decoded (`+` is a space). The first
    /// occurrence of a name wins, empty values count as absent and `PERCENT`
    /// takes precedence over `PERCENTAGE`.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut overrides = Self::default();
        let mut percentage_alias = None;

        for (name, value) in form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match name.as_ref() {
                "DELAY" => &mut overrides.delay,
                "LIMIT" => &mut overrides.limit,
                "DURATION" => &mut overrides.duration,
                "PERCENT" => &mut overrides.percentage,
                "PERCENTAGE" => &mut percentage_alias,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        if overrides.percentage.is_none() {
            overrides.percentage = percentage_alias;
        }
        overrides
    }

    pub fn is_empty(&self) -> bool {
        self.delay.is_none()
            && self.limit.is_none()
            && self.duration.is_none()
            && self.percentage.is_none()
    }
}
