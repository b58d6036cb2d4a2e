use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, bail};
use libhashplay_core::{Id32, chain::ChainVerifier};
use serde::Serialize;
use tracing::{debug_span, info};

use crate::encoder::Encoder;

#[derive(Debug, Clone, Serialize)]
pub struct StreamSummary {
    pub root_hash: Id32,
    pub blocks: u64,
    pub bytes: u64,
    pub cache_hit: bool,
}

/// Prepares `input`, then plays it request by request through a verifier
/// into `output`, like a remote consumer would.
///
/// Verification failure stops the stream immediately. Whatever was written
/// to `output` up to that point is left on disk and must not be trusted.
pub fn stream_file(
    encoder: &Encoder,
    input: &Path,
    output: &Path,
) -> anyhow::Result<StreamSummary> {
    let span = debug_span!("stream", ?input, ?output);
    let _e = span.enter();

    let prepared = encoder
        .prepare(input)
        .with_context(|| format!("error preparing {input:?}"))?;
    let cache_hit = prepared.cache_hit;
    let mut server = encoder.serve(prepared);

    let mut out = BufWriter::new(
        File::create(output).with_context(|| format!("error creating {output:?}"))?,
    );

    let root = server.request(0).context("error requesting root hash")?;
    let root_hash = Id32::from_bytes(&root).context("root hash has wrong length")?;
    let mut verifier = ChainVerifier::new(root_hash);

    let mut bytes = 0u64;
    let mut request_number = 1u64;
    while !verifier.is_finished() {
        let hashed_block = match server.request(request_number) {
            Ok(b) => b,
            Err(e) if e.is_end_of_stream() => {
                bail!("stream ended at request {request_number} before the terminal block")
            }
            Err(e) => {
                return Err(e).with_context(|| format!("error requesting block {request_number}"));
            }
        };
        let verified = verifier.accept(hashed_block).with_context(|| {
            format!("request {request_number} failed verification, {output:?} is incomplete")
        })?;
        out.write_all(&verified.block)
            .with_context(|| format!("error writing to {output:?}"))?;
        bytes += verified.block.len() as u64;
        request_number += 1;
    }
    out.flush()
        .with_context(|| format!("error flushing {output:?}"))?;

    match server.request(request_number) {
        Err(e) if e.is_end_of_stream() => {}
        Ok(_) => bail!("server kept sending blocks after the terminal one"),
        Err(e) => return Err(e).context("unexpected error after the terminal block"),
    }

    info!(
        blocks = verifier.verified_blocks(),
        bytes,
        root_hash = %root_hash,
        "end of stream"
    );
    Ok(StreamSummary {
        root_hash,
        blocks: verifier.verified_blocks(),
        bytes,
        cache_hit,
    })
}
