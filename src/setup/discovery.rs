//! Credential validation and server discovery

use std::collections::HashSet;
use tracing::{debug, info};

use crate::api::PanelApi;
use crate::error::{Error, Result};
use crate::models::{Account, Server};

/// Check that the panel accepts the API key
///
/// # Errors
///
/// `AuthFailure` on a 401 or an unusable key, `NotReady` for anything else.
pub async fn validate_credentials(api: &dyn PanelApi) -> Result<Account> {
    let account = api.get_account().await.map_err(Error::from_setup)?;
    debug!(username = ?account.username, "Panel accepted credentials");
    Ok(account)
}

/// Fetch every server visible to the API key
///
/// Walks pages `1..=total_pages`, where the page count comes from the first
/// page's pagination metadata. Records keep page order; a server listed
/// twice is kept at its first position only.
pub async fn collect_servers(api: &dyn PanelApi) -> Result<Vec<Server>> {
    let mut servers = Vec::new();
    let mut seen = HashSet::new();
    let mut page = 1u32;
    let mut total_pages = 1u32;

    loop {
        let result = api.list_servers(page).await.map_err(Error::from_setup)?;
        if page == 1 {
            total_pages = result.pagination.total_pages.max(1);
        }

        debug!(
            page = page,
            total_pages = total_pages,
            count = result.servers.len(),
            "Fetched server page"
        );

        for server in result.servers {
            if seen.insert(server.identifier.clone()) {
                servers.push(server);
            } else {
                debug!(server_id = %server.identifier, "Skipping duplicate server");
            }
        }

        if page >= total_pages {
            break;
        }
        page += 1;
    }

    info!(servers = servers.len(), pages = total_pages, "Discovered servers");
    Ok(servers)
}
