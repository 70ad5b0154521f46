use tracing::warn;

use crate::config::BenchConfig;
use crate::error::{BenchError, BenchResult};
use crate::provider::ProviderKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Morph {
        api_key: String,
    },
    Modal {
        token_id: String,
        token_secret: String,
    },
    Runloop {
        api_key: String,
    },
}

impl Credentials {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Morph { .. } => ProviderKind::Morph,
            Self::Modal { .. } => ProviderKind::Modal,
            Self::Runloop { .. } => ProviderKind::Runloop,
        }
    }
}

/// Environment variables a provider needs.
pub fn required_vars(kind: ProviderKind) -> &'static [&'static str] {
    match kind {
        ProviderKind::Morph => &["MORPH_API_KEY"],
        ProviderKind::Modal => &["MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"],
        ProviderKind::Runloop => &["RUNLOOP_API_KEY"],
    }
}

/// Read one provider's credentials. Empty values count as unset.
///
/// On failure returns the names of the missing variables.
pub fn lookup<E>(kind: ProviderKind, env: &E) -> Result<Credentials, Vec<&'static str>>
where
    E: Fn(&str) -> Option<String>,
{
    let get = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let missing: Vec<&'static str> = required_vars(kind)
        .iter()
        .copied()
        .filter(|name| get(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(missing);
    }

    let var = |name: &str| get(name).unwrap_or_default();
    Ok(match kind {
        ProviderKind::Morph => Credentials::Morph {
            api_key: var("MORPH_API_KEY"),
        },
        ProviderKind::Modal => Credentials::Modal {
            token_id: var("MODAL_TOKEN_ID"),
            token_secret: var("MODAL_TOKEN_SECRET"),
        },
        ProviderKind::Runloop => Credentials::Runloop {
            api_key: var("RUNLOOP_API_KEY"),
        },
    })
}

/// Apply the credential policy to the selected providers.
///
/// Missing credentials abort the run when the provider was named with
/// `--providers` or `--strict` is set. Otherwise the provider is skipped with
/// a warning. An empty result is an error.
pub fn resolve<E>(config: &BenchConfig, env: &E) -> BenchResult<Vec<Credentials>>
where
    E: Fn(&str) -> Option<String>,
{
    let fatal = config.providers_explicit || config.strict;
    let mut resolved = Vec::with_capacity(config.providers.len());
    let mut skipped = Vec::new();

    for &kind in &config.providers {
        match lookup(kind, env) {
            Ok(creds) => resolved.push(creds),
            Err(missing) if fatal => {
                return Err(BenchError::Credentials {
                    provider: kind,
                    vars: missing.join(", "),
                });
            }
            Err(missing) => {
                warn!(provider = %kind, missing = %missing.join(", "), "credentials not set, skipping provider");
                skipped.push(kind.as_str());
            }
        }
    }

    if resolved.is_empty() {
        return Err(BenchError::NoProviders(format!(
            "no credentials found for {}",
            skipped.join(", ")
        )));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn config(providers: &[ProviderKind], explicit: bool, strict: bool) -> BenchConfig {
        BenchConfig {
            providers: providers.to_vec(),
            providers_explicit: explicit,
            strict,
            ..BenchConfig::default()
        }
    }

    #[test]
    fn lookup_reads_modal_pair() {
        let env = env_from(&[("MODAL_TOKEN_ID", "ak"), ("MODAL_TOKEN_SECRET", "as")]);
        let creds = lookup(ProviderKind::Modal, &env).unwrap();
        assert_eq!(
            creds,
            Credentials::Modal {
                token_id: "ak".into(),
                token_secret: "as".into()
            }
        );
    }

    #[test]
    fn lookup_reports_every_missing_var() {
        let env = env_from(&[]);
        let missing = lookup(ProviderKind::Modal, &env).unwrap_err();
        assert_eq!(missing, vec!["MODAL_TOKEN_ID", "MODAL_TOKEN_SECRET"]);
    }

    #[test]
    fn lookup_treats_blank_as_missing() {
        let env = env_from(&[("RUNLOOP_API_KEY", "  ")]);
        assert!(lookup(ProviderKind::Runloop, &env).is_err());
    }

    #[test]
    fn defaulted_providers_skip_missing_credentials() {
        let env = env_from(&[("RUNLOOP_API_KEY", "rk")]);
        let resolved = resolve(&config(&ProviderKind::ALL, false, false), &env).unwrap();
        let kinds: Vec<ProviderKind> = resolved.iter().map(Credentials::kind).collect();
        assert_eq!(kinds, vec![ProviderKind::Runloop]);
    }

    #[test]
    fn explicit_provider_without_credentials_is_fatal() {
        let env = env_from(&[("RUNLOOP_API_KEY", "rk")]);
        let err = resolve(
            &config(&[ProviderKind::Runloop, ProviderKind::Morph], true, false),
            &env,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "missing credentials for morph: set MORPH_API_KEY"
        );
    }

    #[test]
    fn strict_makes_defaulted_providers_fatal() {
        let env = env_from(&[("RUNLOOP_API_KEY", "rk")]);
        let err = resolve(&config(&ProviderKind::ALL, false, true), &env).unwrap_err();
        assert!(matches!(
            err,
            BenchError::Credentials {
                provider: ProviderKind::Morph,
                ..
            }
        ));
    }

    #[test]
    fn nothing_left_is_an_error() {
        let env = env_from(&[]);
        let err = resolve(&config(&ProviderKind::ALL, false, false), &env).unwrap_err();
        assert!(matches!(err, BenchError::NoProviders(_)), "got: {err}");
        assert!(err.to_string().contains("morph, modal, runloop"), "got: {err}");
    }
}
