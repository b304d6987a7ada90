pub const APP_NAME: &str = "NexTrade Logistics";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_TAG: Option<&str> = option_env!("GIT_TAG");

pub fn version_label() -> String {
    if let Some(tag) = GIT_TAG {
        tag.to_string()
    } else {
        format!("v{}", APP_VERSION)
    }
}

/// Sent with every outbound HTTP request.
pub fn user_agent() -> String {
    format!("nextrade-logistics/{}", version_label())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_carries_version() {
        let agent = user_agent();
        assert!(agent.starts_with("nextrade-logistics/"));
        assert!(agent.contains(&version_label()));
    }
}
