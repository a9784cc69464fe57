use serde::Serialize;
use tokenlens_core::{ProviderCredentials, ProviderId, SectionName};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ProviderInfo {
    id: ProviderId,
    section: SectionName,
    credential: Option<&'static str>,
    env: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ProvidersResponseData {
    providers: Vec<ProviderInfo>,
}

/// Environment variable the CLI reads a provider's credential from.
pub(super) const fn credential_env(provider: ProviderId) -> Option<&'static str> {
    match provider {
        ProviderId::Moralis => Some("MORALIS_API_KEY"),
        ProviderId::BitqueryHolders
        | ProviderId::BitqueryTrades
        | ProviderId::BitqueryTransfers => Some("BITQUERY_OAUTH_TOKEN"),
        ProviderId::Gmgn => None,
    }
}

pub fn run() -> Result<CommandResult, CliError> {
    let providers = ProviderId::ALL
        .into_iter()
        .map(|id| ProviderInfo {
            id,
            section: id.section(),
            credential: ProviderCredentials::required_for(id),
            env: credential_env(id),
        })
        .collect::<Vec<_>>();

    let data = serde_json::to_value(ProvidersResponseData { providers })?;
    Ok(CommandResult::ok(data, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_provider_with_its_section() {
        let result = run().expect("providers command succeeds");
        let providers = result.data["providers"]
            .as_array()
            .expect("providers array");

        assert_eq!(providers.len(), ProviderId::ALL.len());
        assert_eq!(providers[0]["id"], "moralis");
        assert_eq!(providers[0]["section"], "price");
        assert_eq!(providers[0]["env"], "MORALIS_API_KEY");
    }

    #[test]
    fn gmgn_needs_no_credential() {
        assert_eq!(credential_env(ProviderId::Gmgn), None);
        assert_eq!(ProviderCredentials::required_for(ProviderId::Gmgn), None);
    }
}
