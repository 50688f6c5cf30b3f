use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use hcaas_core::{Placement, Reconciler, ResourceKind, TrackedResource};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cli::{LookupArgs, OutputFormat, PlacementArgs};
use crate::output::{mask_secrets, print_success, print_value, print_warning};

pub enum Action<R> {
    Create {
        placement: PlacementArgs,
        record: R,
    },
    Read(LookupArgs),
    Delete(LookupArgs),
    Import(LookupArgs),
}

pub async fn run<K: ResourceKind>(
    reconciler: &Reconciler<K>,
    action: Action<K::Record>,
    default_service: &str,
    format: OutputFormat,
) -> Result<()> {
    match action {
        Action::Create { placement, record } => {
            let service = placement.service_name.as_deref().unwrap_or(default_service);
            let target = Placement::new(&placement.instance).with_service_name(service);
            let resource = reconciler
                .create(target, record)
                .await
                .with_context(|| format!("Failed to create {}", K::NAME))?;
            print_success(&format!("Created {} {}", K::NAME, resource.id.cyan()));
            finish(&resource, placement.state.as_deref(), format)
        }
        Action::Read(lookup) => {
            let mut resource = locate::<K::Record>(&lookup, default_service)?;
            let id = resource.id.clone();
            reconciler
                .read(&mut resource)
                .await
                .with_context(|| format!("Failed to read {} {id}", K::NAME))?;
            if !resource.is_present() {
                print_warning(&format!("{} {} is no longer registered", K::NAME, id.cyan()));
            }
            finish(&resource, lookup.state.as_deref(), format)
        }
        Action::Delete(lookup) => {
            let mut resource = locate::<K::Record>(&lookup, default_service)?;
            let id = resource.id.clone();
            reconciler
                .delete(&mut resource)
                .await
                .with_context(|| format!("Failed to delete {} {id}", K::NAME))?;
            print_success(&format!("Deleted {} {}", K::NAME, id.cyan()));
            if let Some(path) = &lookup.state {
                save_state(path, &resource)?;
            }
            Ok(())
        }
        Action::Import(lookup) => {
            let known = locate::<K::Record>(&lookup, default_service)?;
            let resource = reconciler
                .import(known.placement, &known.id)
                .await
                .with_context(|| format!("Failed to import {} {}", K::NAME, known.id))?;
            if !resource.is_present() {
                anyhow::bail!(
                    "Cannot import {} {}: not registered on instance {}",
                    K::NAME,
                    known.id,
                    resource.placement.instance
                );
            }
            print_success(&format!("Imported {} {}", K::NAME, resource.id.cyan()));
            finish(&resource, lookup.state.as_deref(), format)
        }
    }
}

fn locate<R>(lookup: &LookupArgs, default_service: &str) -> Result<TrackedResource<R>>
where
    R: Default + DeserializeOwned,
{
    if let Some(path) = &lookup.state {
        return load_state(path);
    }
    let instance = lookup.instance.as_deref().context("--instance is required")?;
    let id = lookup.id.as_deref().context("--id is required")?;
    let service = lookup.service_name.as_deref().unwrap_or(default_service);
    Ok(TrackedResource::imported(
        Placement::new(instance).with_service_name(service),
        id,
    ))
}

fn finish<R: Serialize>(
    resource: &TrackedResource<R>,
    state: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    if let Some(path) = state {
        save_state(path, resource)?;
    }
    let value = serde_json::to_value(resource).context("Failed to serialize state")?;
    print_value(&mask_secrets(value), format);
    Ok(())
}

fn load_state<R: DeserializeOwned>(path: &Path) -> Result<TrackedResource<R>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid state file: {}", path.display()))
}

fn save_state<R: Serialize>(path: &Path, resource: &TrackedResource<R>) -> Result<()> {
    let content = serde_json::to_string_pretty(resource)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write state file: {}", path.display()))
}
