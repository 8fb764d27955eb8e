//! Dials a camera or encoder as an RTSP client and turns it into a
//! `router::Producer`: `DESCRIBE` to learn its media, `SETUP` each sending
//! media onto its own interleaved channel pair, `PLAY`, then hand the
//! connection's read loop to a background task that feeds RTP straight
//! into the matching `Track`.

use std::sync::Arc;

use crate::error::Result;
use crate::media::Direction;
use crate::router::{Producer, ProducerSource};
use crate::rtsp::conn::Conn;
use crate::rtsp::transport::InterleavedChannels;
use crate::track::Track;

pub async fn dial_producer(url: &str) -> Result<Arc<Producer>> {
    let conn = Arc::new(Conn::dial(url).await?);
    // Some cameras require an OPTIONS round trip before DESCRIBE will
    // succeed; a handful reject it outright. Either way it's advisory.
    let _ = conn.options().await;

    let medias = conn.describe().await?;
    let mut bound_medias = Vec::new();
    let mut tracks = Vec::new();

    for (index, media) in medias.iter().enumerate() {
        if media.direction != Direction::SendOnly {
            continue;
        }
        let Some(codec) = media.codecs.first() else {
            continue;
        };
        let track = Track::new(codec.clone());
        let channels = InterleavedChannels::for_media_index(index);
        conn.setup_media(media, channels, track.clone()).await?;
        bound_medias.push(media.clone());
        tracks.push(track);
    }

    conn.play().await?;

    let producer = Arc::new(Producer::new(
        ProducerSource::Connected,
        bound_medias,
        tracks,
    ));

    let handle_conn = conn.clone();
    let url = url.to_owned();
    tokio::spawn(async move {
        if let Err(err) = handle_conn.handle().await {
            log::warn!("rtsp source {url} closed: {err}");
        }
    });

    Ok(producer)
}
