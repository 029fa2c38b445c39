use std::path::Path;

use anyhow::Context;
use ferry_profile::{Credentials, StaticProfileStore};
use serde_json::json;

#[derive(Debug, clap::Args)]
pub struct Profiles {
    /// Print a JSON array instead of one line per profile
    #[arg(long)]
    pub json: bool,
}

impl Profiles {
    pub fn run(self, path: &Path) -> anyhow::Result<()> {
        let store = StaticProfileStore::load(path)
            .with_context(|| format!("loading profiles from {}", path.display()))?;

        if store.is_empty() {
            tracing::warn!(path = %path.display(), "no profiles configured");
        }

        if self.json {
            let listing: Vec<_> = store
                .iter()
                .map(|p| {
                    json!({
                        "name": p.name,
                        "host": p.host,
                        "auth": auth_kind(&p.credentials),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        } else {
            for p in store.iter() {
                println!("{}\t{}\t{}", p.name, p.host, auth_kind(&p.credentials));
            }
        }
        Ok(())
    }
}

fn auth_kind(credentials: &Credentials) -> &'static str {
    match credentials {
        Credentials::None => "none",
        Credentials::Basic { .. } => "basic",
        Credentials::Token { .. } => "token",
    }
}
