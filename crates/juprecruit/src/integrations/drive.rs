use std::io::Cursor;

use async_trait::async_trait;
use google_drive3::common::{Connector, GetToken};
use google_drive3::hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use google_drive3::hyper_util::client::legacy::{connect::HttpConnector, Client};
use google_drive3::hyper_util::rt::TokioExecutor;
use google_drive3::{api::File, api::Scope, DriveHub};

use super::IntegrationError;
use crate::recruitment::storage::{DriveFile, DriveGateway, DriveOperationError, DriveUpload};

/// Wrapper around the generated google-drive3 client used for resume uploads.
pub struct GoogleDriveClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
}

impl<C> GoogleDriveClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>) -> Self {
        Self { hub }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> DriveOperationError {
        DriveOperationError::Backend(err.to_string())
    }
}

impl GoogleDriveClient<HttpsConnector<HttpConnector>> {
    /// HTTPS hub backed by the platform's root certificates.
    pub fn with_native_roots<A: GetToken + 'static>(auth: A) -> Result<Self, IntegrationError> {
        let connector = HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| IntegrationError::Tls(err.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self::new(DriveHub::new(client, auth)))
    }
}

impl<C> std::fmt::Debug for GoogleDriveClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> DriveGateway for GoogleDriveClient<C>
where
    C: Connector + Send + Sync + 'static,
{
    async fn upload_file(&self, upload: DriveUpload) -> Result<DriveFile, DriveOperationError> {
        let metadata = File {
            name: Some(upload.name.clone()),
            mime_type: Some(upload.mime_type.clone()),
            parents: upload.parent_folder_id.map(|parent| vec![parent]),
            ..File::default()
        };
        let media_type: mime::Mime = upload
            .mime_type
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);

        let (_, file) = self
            .hub
            .files()
            .create(metadata)
            .param("fields", "id,name,mimeType")
            .supports_all_drives(true)
            .add_scope(Scope::Full)
            .upload(Cursor::new(upload.bytes), media_type)
            .await
            .map_err(GoogleDriveClient::<C>::map_error)?;

        Ok(DriveFile {
            file_id: file.id.unwrap_or_default(),
            name: file.name.unwrap_or(upload.name),
            mime_type: file.mime_type.or(Some(upload.mime_type)),
        })
    }
}
