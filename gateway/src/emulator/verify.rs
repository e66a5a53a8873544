use std::io::Cursor;
use std::time::Duration;

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::config::VerifyMode;
use crate::error::{GatewayError, Result};

/// Stream properties of a fully decoded media body
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMedia {
    pub codec: String,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub frames: u64,
}

impl DecodedMedia {
    pub fn duration(&self) -> Option<Duration> {
        let rate = self.sample_rate.filter(|rate| *rate > 0)?;
        let nanos = u128::from(self.frames) * 1_000_000_000 / u128::from(rate);
        Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
    }
}

/// What a verification attempt observed
#[derive(Debug)]
pub enum VerifyOutcome {
    Skipped,
    Head {
        status: u16,
        content_type: String,
    },
    Fetched {
        status: u16,
        content_type: String,
        bytes: usize,
        decoded: Result<DecodedMedia>,
    },
    Failed(String),
}

/// Check from the emulator that a played media URL is usable. Logs the outcome and returns it.
pub async fn verify_media(client: reqwest::Client, speaker: String, url: String, mode: VerifyMode) -> VerifyOutcome {
    match mode {
        VerifyMode::Off => VerifyOutcome::Skipped,
        VerifyMode::Head => match client.head(&url).send().await {
            Ok(response) => {
                let status = response.status();
                let content_type = content_type(&response);
                log::info!("[{}] VERIFY HEAD {} -> {} ({})", speaker, url, status, content_type);
                VerifyOutcome::Head {
                    status: status.as_u16(),
                    content_type,
                }
            }
            Err(e) => {
                log::warn!("[{}] VERIFY FAILED HEAD {}: {}", speaker, url, e);
                VerifyOutcome::Failed(e.to_string())
            }
        },
        VerifyMode::Fetch => fetch_and_decode(client, &speaker, &url).await,
    }
}

async fn fetch_and_decode(client: reqwest::Client, speaker: &str, url: &str) -> VerifyOutcome {
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            log::warn!("[{}] VERIFY FAILED GET {}: {}", speaker, url, e);
            return VerifyOutcome::Failed(e.to_string());
        }
    };

    let status = response.status();
    let content_type = content_type(&response);
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("[{}] VERIFY FAILED reading {}: {}", speaker, url, e);
            return VerifyOutcome::Failed(e.to_string());
        }
    };
    let bytes = body.len();

    let extension = extension_of(url);
    let mime = content_type.clone();
    let decoded = tokio::task::spawn_blocking(move || {
        decode_media(body.to_vec(), extension.as_deref(), Some(mime.as_str()))
    })
    .await
    .unwrap_or_else(|e| Err(GatewayError::DecodeFailed(format!("Decoder task failed: {}", e))));

    match &decoded {
        Ok(media) => log::info!(
            "[{}] VERIFY GET {} -> {} ({}, {} bytes, {}, {:.2}s)",
            speaker,
            url,
            status,
            content_type,
            bytes,
            media.codec,
            media.duration().map(|d| d.as_secs_f64()).unwrap_or(0.0)
        ),
        Err(e) => log::warn!(
            "[{}] VERIFY GET {} -> {} ({}, {} bytes) but {}",
            speaker,
            url,
            status,
            content_type,
            bytes,
            e
        ),
    }

    VerifyOutcome::Fetched {
        status: status.as_u16(),
        content_type,
        bytes,
        decoded,
    }
}

/// Detect the container of `data` and decode every packet, counting frames
pub fn decode_media(data: Vec<u8>, extension: Option<&str>, mime_type: Option<&str>) -> Result<DecodedMedia> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }
    if let Some(mime_type) = mime_type {
        hint.mime_type(mime_type);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| GatewayError::DecodeFailed(format!("Unrecognized media format: {}", e)))?;
    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| GatewayError::DecodeFailed("No audio track found".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let codecs = symphonia::default::get_codecs();
    let mut decoder = codecs
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| GatewayError::DecodeFailed(format!("Failed to create decoder: {}", e)))?;
    let codec = codecs
        .get_codec(codec_params.codec)
        .map(|descriptor| descriptor.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", codec_params.codec));

    let mut frames = 0u64;
    let mut sample_rate = codec_params.sample_rate;
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(GatewayError::DecodeFailed(format!("Decode error: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                frames += decoded.frames() as u64;
                sample_rate = sample_rate.or(Some(decoded.spec().rate));
            }
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(GatewayError::DecodeFailed(format!("Decode error: {}", e))),
        }
    }

    if frames == 0 {
        return Err(GatewayError::DecodeFailed("No audio frames decoded".to_string()));
    }

    Ok(DecodedMedia {
        codec,
        sample_rate,
        channels: codec_params.channels.map(|c| c.count()),
        frames,
    })
}

fn content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// File extension of the URL path, ignoring query and fragment
fn extension_of(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let file = path.rsplit('/').next()?;
    let (_, extension) = file.rsplit_once('.')?;
    if extension.is_empty() {
        None
    } else {
        Some(extension.to_ascii_lowercase())
    }
}
