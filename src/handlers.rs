//! The dataset functions invoked by the workflow.
//!
//! Each handler reads its dataset from the [`Event`], produces exactly one
//! object and returns the store's acknowledgement. Nothing is retried: the
//! first failure is returned and the invoker records which stage failed.

use tracing::{error, info};

use crate::benner;
use crate::error::HandlerError;
use crate::event::{Dataset, Event, RemoteDataset};
use crate::fetch::{HttpClient, fetch_source};
use crate::masses::{self, MassError};
use crate::outcome::Outcome;
use crate::store::{CSV_CONTENT_TYPE, JSON_CONTENT_TYPE, ObjectStore, PutAck, UploadTarget};

fn remote_dataset(event: &Event, dataset: Dataset) -> Result<&RemoteDataset, HandlerError> {
    let remote = match dataset {
        Dataset::Benner => event.benner.as_ref(),
        Dataset::Exoplanets => event.exoplanets.as_ref(),
        Dataset::Masses => None,
    };
    remote.ok_or(HandlerError::MissingDataset(dataset))
}

async fn download<C: HttpClient>(
    client: &C,
    dataset: Dataset,
    remote: &RemoteDataset,
) -> Result<Vec<u8>, HandlerError> {
    fetch_source(client, &remote.url)
        .await
        .map_err(|source| HandlerError::Download {
            dataset,
            url: remote.url.clone(),
            source,
        })
}

async fn upload<S: ObjectStore + ?Sized>(
    store: &S,
    dataset: Dataset,
    target: UploadTarget,
    body: Vec<u8>,
    content_type: &str,
) -> Result<PutAck, HandlerError> {
    let result = target.upload(store, body, content_type).await;
    result.map_err(|source| HandlerError::Upload {
        dataset,
        target,
        source,
    })
}

fn log_failure(err: &HandlerError) {
    error!(stage = %err.stage(), error = %err, "Handler failed");
}

async fn benner_to_store<C, S>(
    event: &Event,
    client: &C,
    store: &S,
) -> Result<PutAck, HandlerError>
where
    C: HttpClient,
    S: ObjectStore + ?Sized,
{
    let remote = remote_dataset(event, Dataset::Benner)?;
    let report = download(client, Dataset::Benner, remote).await?;

    let csv = benner::parse_csv(&report).map_err(|source| HandlerError::Transform {
        dataset: Dataset::Benner,
        source,
    })?;

    let target = UploadTarget::new(&event.bucket_name, &remote.filename);
    upload(store, Dataset::Benner, target, csv, CSV_CONTENT_TYPE).await
}

/// Downloads the Benner delta-v report, converts it to CSV and stores it.
#[tracing::instrument(skip_all, fields(bucket = %event.bucket_name))]
pub async fn download_benner<C, S>(
    event: &Event,
    client: &C,
    store: &S,
) -> Result<PutAck, HandlerError>
where
    C: HttpClient,
    S: ObjectStore + ?Sized,
{
    benner_to_store(event, client, store)
        .await
        .inspect_err(log_failure)
}

async fn exoplanets_to_store<C, S>(
    event: &Event,
    client: &C,
    store: &S,
) -> Result<PutAck, HandlerError>
where
    C: HttpClient,
    S: ObjectStore + ?Sized,
{
    let remote = remote_dataset(event, Dataset::Exoplanets)?;
    let catalog = download(client, Dataset::Exoplanets, remote).await?;

    let target = UploadTarget::new(&event.bucket_name, &remote.filename);
    upload(store, Dataset::Exoplanets, target, catalog, CSV_CONTENT_TYPE).await
}

/// Downloads the exoplanet catalog and stores the bytes unmodified.
#[tracing::instrument(skip_all, fields(bucket = %event.bucket_name))]
pub async fn download_exoplanets<C, S>(
    event: &Event,
    client: &C,
    store: &S,
) -> Result<PutAck, HandlerError>
where
    C: HttpClient,
    S: ObjectStore + ?Sized,
{
    exoplanets_to_store(event, client, store)
        .await
        .inspect_err(log_failure)
}

async fn upload_masses<S: ObjectStore + ?Sized>(
    store: &S,
    target: &UploadTarget,
    json: Vec<u8>,
) -> Outcome<PutAck, MassError> {
    target
        .upload(store, json, JSON_CONTENT_TYPE)
        .await
        .map_err(|source| MassError::Upload {
            bucket: target.bucket.clone(),
            key: target.key.clone(),
            source,
        })
        .into()
}

/// Aggregates the local mass table and stores it as a JSON object.
///
/// The stages are chained as an [`Outcome`]; whichever failed first is
/// returned as [`HandlerError::Masses`].
#[tracing::instrument(skip_all, fields(bucket = %event.bucket_name))]
pub async fn parse_masses<S>(event: &Event, store: &S) -> Result<PutAck, HandlerError>
where
    S: ObjectStore + ?Sized,
{
    let Some(dataset) = event.masses.as_ref() else {
        let err = HandlerError::MissingDataset(Dataset::Masses);
        log_failure(&err);
        return Err(err);
    };
    let target = UploadTarget::new(&event.bucket_name, &dataset.filename);

    masses::load_masses(&dataset.path, dataset.policy)
        .then_async(|json| upload_masses(store, &target, json))
        .await
        .into_result()
        .map_err(HandlerError::from)
        .inspect_err(log_failure)
}

/// Runs every function whose dataset is present in the event, in workflow
/// order, and combines their acknowledgements.
///
/// Every present function runs even if an earlier one failed; the first
/// failure in order is what gets reported.
#[tracing::instrument(skip_all, fields(bucket = %event.bucket_name))]
pub async fn run_all<C, S>(
    event: &Event,
    client: &C,
    store: &S,
) -> Result<Vec<PutAck>, HandlerError>
where
    C: HttpClient,
    S: ObjectStore + ?Sized,
{
    let mut outcomes: Vec<Outcome<PutAck, HandlerError>> = Vec::new();

    if event.benner.is_some() {
        outcomes.push(download_benner(event, client, store).await.into());
    }
    if event.exoplanets.is_some() {
        outcomes.push(download_exoplanets(event, client, store).await.into());
    }
    if event.masses.is_some() {
        outcomes.push(parse_masses(event, store).await.into());
    }

    let acks = Outcome::all(outcomes).into_result()?;
    info!(uploaded = acks.len(), "All dataset functions completed");
    Ok(acks)
}
