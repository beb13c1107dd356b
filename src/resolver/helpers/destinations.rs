// src/resolver/helpers/destinations.rs

//! Picking repositories for changes to land in

use super::SpecList;
use crate::error::{Error, Result};
use crate::name::RepositoryName;
use crate::package::{PackageId, Repository, RepositoryKind};
use crate::resolver::decision::ChangesToMakeDecision;
use crate::resolver::functions::ResolverContext;
use crate::resolver::resolvent::DestinationType;
use std::sync::Arc;

/// The most important repository of `kind` that can take `origin`
fn best_repository_for<'a>(
    ctx: &ResolverContext<'a>,
    kind: RepositoryKind,
    origin: &PackageId,
) -> Option<&'a Repository> {
    let origin_kind = ctx.env.repository_kind(origin)?;
    ctx.env
        .repositories()
        .iter()
        .filter(|r| r.kind == kind && r.is_suitable_destination_for(origin_kind))
        .max_by_key(|r| r.importance)
}

pub fn find_repository_for(
    ctx: &ResolverContext<'_>,
    decision: &ChangesToMakeDecision,
) -> Result<RepositoryName> {
    let kind = match decision.resolvent.destination_type {
        DestinationType::InstallToSlash => RepositoryKind::Installed,
        DestinationType::CreateBinary => RepositoryKind::Binary,
    };
    best_repository_for(ctx, kind, &decision.origin_id)
        .map(|r| r.name.clone())
        .ok_or_else(|| Error::NoDestination(decision.resolvent.to_string()))
}

/// Same-slot ids already in the destination
pub fn find_replacing(
    ctx: &ResolverContext<'_>,
    id: &PackageId,
    repository: &Repository,
) -> Vec<Arc<PackageId>> {
    ctx.env
        .package_ids(&id.name)
        .into_iter()
        .filter(|other| other.repository == repository.name && other.slot == id.slot)
        .collect()
}

/// Binary repository to build through, for source installs listed in
/// `make_binaries`
pub fn wants_via_binary(
    ctx: &ResolverContext<'_>,
    make_binaries: &SpecList,
    decision: &ChangesToMakeDecision,
) -> Option<RepositoryName> {
    let origin = &decision.origin_id;
    if decision.resolvent.destination_type != DestinationType::InstallToSlash
        || !origin.binary_capable
        || !make_binaries.matches(origin)
        || ctx.env.repository_kind(origin) != Some(RepositoryKind::Source)
    {
        return None;
    }
    best_repository_for(ctx, RepositoryKind::Binary, origin).map(|r| r.name.clone())
}
