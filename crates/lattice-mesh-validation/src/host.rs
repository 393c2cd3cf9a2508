//! Host normalization
//!
//! DestinationRule hosts come in short (`reviews`), namespaced
//! (`reviews.bookinfo`) and fully qualified (`reviews.bookinfo.svc.cluster.local`)
//! forms. [`Host::parse`] splits any of them into a structured triple, taking
//! missing parts from the owning object's metadata.

use std::fmt;

use crate::WILDCARD_HOST;

/// A normalized `service.namespace.cluster` host
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Host {
    /// Short service name (first dotted segment)
    pub service: String,
    /// Namespace (second segment, or the owning object's namespace)
    pub namespace: String,
    /// Cluster domain (remaining segments, or the owning object's cluster)
    pub cluster: String,
}

impl Host {
    /// Parse a dotted host name.
    ///
    /// Parts present in the host name take precedence over the object
    /// metadata. Any input yields a best-effort host; there is no error path.
    pub fn parse(host: &str, namespace: &str, cluster: &str) -> Self {
        let mut parts = host.split('.');
        let service = parts.next().unwrap_or_default().to_string();
        let host_namespace = parts.next().unwrap_or_default();
        let host_cluster = parts.collect::<Vec<_>>().join(".");

        Self {
            service,
            namespace: if host_namespace.is_empty() {
                namespace.to_string()
            } else {
                host_namespace.to_string()
            },
            cluster: if host_cluster.is_empty() {
                cluster.to_string()
            } else {
                host_cluster
            },
        }
    }

    /// Whether this host matches every service in the mesh
    pub fn is_wildcard(&self) -> bool {
        self.service == WILDCARD_HOST
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.service)?;
        for part in [&self.namespace, &self.cluster] {
            if !part.is_empty() {
                write!(f, ".{}", part)?;
            }
        }
        Ok(())
    }
}
