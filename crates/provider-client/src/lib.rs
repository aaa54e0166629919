pub mod geocode;
pub mod google;
pub mod merchant;
pub mod retry;
pub mod rides;
pub mod types;

use geocode::GeocodeClient;
use google::WorkspaceClient;
use merchant::MerchantSearcher;

/// All collaborator clients for simultaneous access
#[derive(Debug)]
pub struct ProviderClients {
    pub merchant: MerchantSearcher,
    pub geocode: GeocodeClient,
    pub workspace: WorkspaceClient,
}

impl Default for ProviderClients {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderClients {
    #[must_use]
    pub fn new() -> Self {
        Self {
            merchant: MerchantSearcher::new(),
            geocode: GeocodeClient::new(),
            workspace: WorkspaceClient::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_clients_creation() {
        let _clients = ProviderClients::new();
    }
}
