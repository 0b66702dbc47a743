//! Resolving a command-line target into live sessions.
//!
//! A target is `all`, the unique id of a known device, or `host[:port]`.

use std::net::SocketAddr;

use hvc_core::{discover, discover_all, DiscoveryOptions, SessionRegistry};
use tokio::net::lookup_host;

use crate::commands::Context;
use crate::error::{CliError, Result, StorageError};
use crate::storage::KnownDevice;

/// A resolved target
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Every device answering on the broadcast addresses
    All,
    /// A device from the known-device store
    Known(KnownDevice),
    /// Whatever answers at this address
    Address(SocketAddr),
}

/// Resolve a target string against the known-device store and DNS.
pub async fn resolve(target: &str, ctx: &Context) -> Result<Target> {
    if target.eq_ignore_ascii_case("all") {
        return Ok(Target::All);
    }

    // Targets that cannot be store keys (e.g. bracketed IPv6) skip the store.
    match ctx.store()?.read(target).await {
        Ok(Some(device)) => return Ok(Target::Known(device)),
        Ok(None) | Err(StorageError::InvalidName(_)) => {}
        Err(e) => return Err(e.into()),
    }

    resolve_address(target, ctx.port).await.map(Target::Address)
}

/// Resolve `host[:port]`, using `default_port` when no port is given.
pub async fn resolve_address(address: &str, default_port: u16) -> Result<SocketAddr> {
    let with_port = if address.parse::<SocketAddr>().is_ok() || has_port(address) {
        address.to_string()
    } else if address.contains(':') {
        // Bare IPv6 literal
        format!("[{}]:{}", address, default_port)
    } else {
        format!("{}:{}", address, default_port)
    };

    let mut resolved = lookup_host(with_port)
        .await
        .map_err(|e| CliError::InvalidArgument(format!("Cannot resolve '{}': {}", address, e)))?;

    resolved
        .next()
        .ok_or_else(|| CliError::InvalidArgument(format!("No address for '{}'", address)))
}

fn has_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty()
                && (host.starts_with('[') || !host.contains(':'))
                && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Open sessions for a resolved target.
///
/// Fails with [`CliError::NoDevicesFound`] when nothing answered.
pub async fn connect(target: &Target, ctx: &Context) -> Result<SessionRegistry> {
    let mut registry = SessionRegistry::new();

    match target {
        Target::All => {
            discover_all(&ctx.broadcast_addresses(), &ctx.discovery_options(), &mut registry)
                .await?;
        }
        Target::Known(device) => {
            let address = resolve_address(&device.host, device.port).await?;
            let options = DiscoveryOptions::directed(device.unique_id.clone())
                .with_timeout(ctx.timeout);
            registry.merge(discover(address, &options).await?);
        }
        Target::Address(address) => {
            registry.merge(discover(*address, &ctx.discovery_options()).await?);
        }
    }

    if registry.is_empty() {
        return Err(CliError::NoDevicesFound);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_port() {
        assert!(has_port("192.168.1.40:38866"));
        assert!(has_port("[::1]:38866"));
        assert!(has_port("hvc.local:1234"));
        assert!(!has_port("192.168.1.40"));
        assert!(!has_port("fe80::1"));
    }

    #[tokio::test]
    async fn test_resolve_address_default_port() {
        let addr = resolve_address("127.0.0.1", 38866).await.unwrap();
        assert_eq!(addr, "127.0.0.1:38866".parse().unwrap());

        let addr = resolve_address("127.0.0.1:4000", 38866).await.unwrap();
        assert_eq!(addr.port(), 4000);

        let addr = resolve_address("::1", 38866).await.unwrap();
        assert_eq!(addr, "[::1]:38866".parse().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_all_and_known() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context {
            data_dir: Some(tmp.path().to_path_buf()),
            ..Context::default()
        };

        assert_eq!(resolve("ALL", &ctx).await.unwrap(), Target::All);

        let device = KnownDevice {
            unique_id: "hvc-known".to_string(),
            host: "127.0.0.1".to_string(),
            port: 40000,
            name: "Attic".to_string(),
            added_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        ctx.store().unwrap().save(&device).await.unwrap();

        assert_eq!(
            resolve("hvc-known", &ctx).await.unwrap(),
            Target::Known(device)
        );
        assert_eq!(
            resolve("127.0.0.1", &ctx).await.unwrap(),
            Target::Address("127.0.0.1:38866".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_resolve_reports_corrupt_known_device() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context {
            data_dir: Some(tmp.path().to_path_buf()),
            ..Context::default()
        };
        std::fs::write(tmp.path().join("hvc-broken.json"), "{ not json").unwrap();

        let err = resolve("hvc-broken", &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Storage(StorageError::Serialization(_))
        ));

        // Not a valid store key, resolved as an address instead.
        assert_eq!(
            resolve("[::1]:4000", &ctx).await.unwrap(),
            Target::Address("[::1]:4000".parse().unwrap())
        );
    }
}
