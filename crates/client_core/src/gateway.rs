use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::MediaType,
    error::ErrorBody,
    protocol::{BatchPredictionResponse, PredictionResult},
};
use tracing::debug;

use crate::{
    config::{ConfigError, Settings},
    error::GatewayError,
    upload::UploadFile,
};

const SINGLE_FIELD: &str = "file";
const BATCH_FIELD: &str = "files";

pub fn single_path(media: MediaType) -> &'static str {
    match media {
        MediaType::Image => "/predict/image/",
        MediaType::Audio => "/predict/audio/",
    }
}

pub fn batch_path(media: MediaType) -> &'static str {
    match media {
        MediaType::Image => "/predict/batch/image",
        MediaType::Audio => "/predict/batch/audio",
    }
}

#[async_trait]
pub trait PredictionGateway: Send + Sync {
    async fn predict(
        &self,
        media: MediaType,
        file: &UploadFile,
    ) -> Result<PredictionResult, GatewayError>;

    async fn batch_predict(
        &self,
        media: MediaType,
        files: &[UploadFile],
    ) -> Result<BatchPredictionResponse, GatewayError>;

    async fn predict_image(&self, file: &UploadFile) -> Result<PredictionResult, GatewayError> {
        self.predict(MediaType::Image, file).await
    }

    async fn predict_audio(&self, file: &UploadFile) -> Result<PredictionResult, GatewayError> {
        self.predict(MediaType::Audio, file).await
    }

    async fn batch_predict_image(
        &self,
        files: &[UploadFile],
    ) -> Result<BatchPredictionResponse, GatewayError> {
        self.batch_predict(MediaType::Image, files).await
    }

    async fn batch_predict_audio(
        &self,
        files: &[UploadFile],
    ) -> Result<BatchPredictionResponse, GatewayError> {
        self.batch_predict(MediaType::Audio, files).await
    }
}

pub struct HttpPredictionGateway {
    http: Client,
    server_url: String,
}

impl HttpPredictionGateway {
    pub fn new(settings: &Settings) -> Result<Self, ConfigError> {
        let base = settings.base_url()?;
        let http = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http,
            server_url: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn part(file: &UploadFile) -> Part {
        let part = Part::bytes(file.bytes().to_vec()).file_name(file.filename.clone());
        match part.mime_str(file.mime_type()) {
            Ok(part) => part,
            Err(_) => Part::bytes(file.bytes().to_vec()).file_name(file.filename.clone()),
        }
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T, GatewayError> {
        let url = format!("{}{path}", self.server_url);
        debug!(%url, "posting prediction request");
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(GatewayError::from_reqwest)?;
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body: ErrorBody::parse(&bytes),
        });
    }
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))
}

#[async_trait]
impl PredictionGateway for HttpPredictionGateway {
    async fn predict(
        &self,
        media: MediaType,
        file: &UploadFile,
    ) -> Result<PredictionResult, GatewayError> {
        let form = Form::new().part(SINGLE_FIELD, Self::part(file));
        self.post_form(single_path(media), form).await
    }

    async fn batch_predict(
        &self,
        media: MediaType,
        files: &[UploadFile],
    ) -> Result<BatchPredictionResponse, GatewayError> {
        let form = files
            .iter()
            .fold(Form::new(), |form, file| form.part(BATCH_FIELD, Self::part(file)));
        self.post_form(batch_path(media), form).await
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
