//! Responsible for fetching the bus stops from the NUS NextBus API
use std::{backtrace::Backtrace, time::Duration};

use reqwest::Client;
use tracing::{Instrument, info, info_span};

use crate::{
    config::NusApiConfig,
    model::nus_api_model::BusStopsResponse,
    pipeline::normalizer::{SourceFormatError, parse_json},
};

pub struct NusNextBusClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl NusNextBusClient {
    pub fn new(config: &NusApiConfig, password: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(NusNextBusClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: password.to_string(),
        })
    }

    #[tracing::instrument(err, skip(self), fields(base_url = %self.base_url))]
    pub async fn fetch_bus_stops(&self) -> Result<BusStopsResponse, FetchError> {
        let request = format!("{}/BusStops", self.base_url);

        let response = self
            .client
            .get(&request)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .instrument(info_span!("Fetching bus stops"))
            .await?
            .error_for_status()?;

        let body = response
            .text()
            .instrument(info_span!("Reading body of response"))
            .await?;

        let stops = parse_response(body)?;

        info!("got {} institutional bus stops", stops.result.busstops.len());

        Ok(stops)
    }
}

pub fn parse_bus_stops(body: &str) -> Result<BusStopsResponse, SourceFormatError> {
    parse_json(body, "NUS NextBus bus stops response")
}

fn parse_response(body: String) -> Result<BusStopsResponse, FetchError> {
    parse_bus_stops(&body).map_err(|source| FetchError::ParsingError {
        source,
        backtrace: Backtrace::capture(),
        body,
    })
}

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("error fetching the bus stops")]
    HttpRequestError(#[from] reqwest::Error),

    #[error("error parsing the bus stops \n{} \n{}", body, backtrace)]
    ParsingError {
        source: SourceFormatError,
        backtrace: Backtrace,
        body: String,
    },
}
