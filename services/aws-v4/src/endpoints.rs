//! Service/region catalog for the `aws` partition.
//!
//! Signing only needs to know whether a region is a legitimate endpoint for a
//! service, so the catalog is a plain immutable mapping from service name to
//! the regions that serve it. The data is the SDKs' `endpoints.json` for the
//! `aws` partition, bundled at build time and parsed once on first use.
//!
//! A service is listed under its endpoint prefix (`es`, `api.ecr`,
//! `streams.dynamodb`, ...) and under its signing name (`ecr`, `dynamodb`),
//! since the signing name is what requests are signed with.

use once_cell::sync::Lazy;
use serde::de::Error as _;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Partition id of the default catalog.
pub const AWS_PARTITION_ID: &str = "aws";

const ENDPOINTS_JSON: &str = include_str!("endpoints.json");

/// Signing names whose endpoints are not listed in `endpoints.json`, with
/// the service they share their regions with.
const SHARED_REGIONS: &[(&str, &str)] = &[
    ("execute-api", "apigateway"),
    ("s3-object-lambda", "s3"),
];

static AWS_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_endpoints_json(AWS_PARTITION_ID, ENDPOINTS_JSON)
        .expect("bundled endpoints.json must be valid")
});

#[derive(Deserialize)]
struct EndpointsDocument {
    partitions: Vec<PartitionDocument>,
}

#[derive(Deserialize)]
struct PartitionDocument {
    partition: String,
    regions: BTreeMap<String, serde::de::IgnoredAny>,
    services: BTreeMap<String, ServiceDocument>,
}

#[derive(Deserialize)]
struct ServiceDocument {
    #[serde(default)]
    defaults: EndpointDocument,
    endpoints: BTreeMap<String, EndpointDocument>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EndpointDocument {
    #[serde(default)]
    credential_scope: CredentialScopeDocument,
    #[serde(default)]
    deprecated: bool,
}

#[derive(Default, Deserialize)]
struct CredentialScopeDocument {
    region: Option<String>,
    service: Option<String>,
}

/// Errors returned when a service/region pair is not in the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The service is not known to the catalog at all.
    #[error("service {service} does not exist")]
    ServiceNotFound {
        /// The offending service.
        service: String,
    },
    /// The service is known, but not served from this region.
    #[error("region {region} does not exist")]
    RegionNotFound {
        /// The offending region.
        region: String,
    },
}

/// Catalog maps every service of a partition to the regions serving it.
#[derive(Debug, Clone)]
pub struct Catalog {
    partition_id: String,
    services: BTreeMap<String, BTreeSet<String>>,
}

impl Catalog {
    /// Build a catalog from `(service, regions)` entries.
    ///
    /// Entries for the same service are merged.
    pub fn new<S, R>(
        partition_id: impl Into<String>,
        entries: impl IntoIterator<Item = (S, R)>,
    ) -> Self
    where
        S: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let mut services: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (service, regions) in entries {
            services
                .entry(service.as_ref().to_string())
                .or_default()
                .extend(regions.into_iter().map(|v| v.as_ref().to_string()));
        }

        Self {
            partition_id: partition_id.into(),
            services,
        }
    }

    /// Build the catalog of `partition_id` from an SDK `endpoints.json`.
    ///
    /// A service is served from every region it has a non-deprecated
    /// endpoint for, either keyed by the region itself or scoped to it like
    /// the `aws-global` endpoint of `iam`. Keys that are no region of the
    /// partition (`fips-us-east-1`, `aws-global`) never count on their own.
    pub fn from_endpoints_json(partition_id: &str, json: &str) -> serde_json::Result<Self> {
        let doc: EndpointsDocument = serde_json::from_str(json)?;
        let partition = doc
            .partitions
            .into_iter()
            .find(|p| p.partition == partition_id)
            .ok_or_else(|| {
                serde_json::Error::custom(format!("partition {partition_id} not found"))
            })?;

        let mut entries: Vec<(String, BTreeSet<String>)> = Vec::new();
        for (name, service) in &partition.services {
            let mut regions = BTreeSet::new();
            for (key, endpoint) in &service.endpoints {
                if endpoint.deprecated {
                    continue;
                }
                if partition.regions.contains_key(key) {
                    regions.insert(key.clone());
                }
                if let Some(region) = &endpoint.credential_scope.region {
                    if partition.regions.contains_key(region) {
                        regions.insert(region.clone());
                    }
                }
            }

            if let Some(signing_name) = name.strip_prefix("api.") {
                entries.push((signing_name.to_string(), regions.clone()));
            }
            if let Some(signing_name) = &service.defaults.credential_scope.service {
                entries.push((signing_name.clone(), regions.clone()));
            }
            entries.push((name.clone(), regions));
        }

        let mut catalog = Catalog::new(partition_id, entries);
        for (name, shared) in SHARED_REGIONS {
            if let Some(regions) = catalog.services.get(*shared).cloned() {
                catalog
                    .services
                    .entry(name.to_string())
                    .or_default()
                    .extend(regions);
            }
        }

        Ok(catalog)
    }

    /// The built-in catalog of the `aws` partition.
    pub fn aws() -> &'static Catalog {
        &AWS_CATALOG
    }

    /// Partition id of this catalog.
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    /// All services in this catalog, sorted.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Regions serving the given service, sorted.
    ///
    /// Returns `None` if the service is unknown.
    pub fn regions_for_service(&self, service: &str) -> Option<impl Iterator<Item = &str>> {
        self.services
            .get(service)
            .map(|regions| regions.iter().map(String::as_str))
    }

    /// Check that `region` is a valid endpoint region for `service`.
    ///
    /// Matching is exact: no case folding, trimming or prefix matching.
    pub fn validate(&self, region: &str, service: &str) -> Result<(), ValidationError> {
        let regions =
            self.services
                .get(service)
                .ok_or_else(|| ValidationError::ServiceNotFound {
                    service: service.to_string(),
                })?;

        if regions.contains(region) {
            Ok(())
        } else {
            Err(ValidationError::RegionNotFound {
                region: region.to_string(),
            })
        }
    }
}

/// Check `region`/`service` against the built-in `aws` catalog.
pub fn validate(region: &str, service: &str) -> Result<(), ValidationError> {
    Catalog::aws().validate(region, service)
}
