use std::sync::Arc;

use bytes::Bytes;
use libhashplay_core::{
    Error, Id32, Result,
    chain::{make_hashed_block, zero_hash},
    lengths::BlockInfo,
};
use tracing::{debug, trace};

use crate::{
    encoder::PreparedFile,
    file_ops::{block_buffer, read_block},
    opened_file::LazyFile,
    storage::CacheStore,
};

/// Serves one prepared file to one consumer, a request at a time.
///
/// Request 0 is the root hash. Request `n` is block `n - 1` followed by the
/// chain hash of block `n`, or by 32 zero bytes for the last block. Once the
/// last block is served, or a request goes past it, every further request is
/// [`Error::EndOfStream`].
pub struct BlockServer {
    prepared: PreparedFile,
    store: Arc<dyn CacheStore>,
    file: LazyFile,
    buf: Vec<u8>,
    finished: bool,
}

impl BlockServer {
    pub(crate) fn new(prepared: PreparedFile, store: Arc<dyn CacheStore>) -> Self {
        Self {
            file: LazyFile::new(prepared.path.clone()),
            buf: Vec::new(),
            prepared,
            store,
            finished: false,
        }
    }

    pub fn prepared(&self) -> &PreparedFile {
        &self.prepared
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_file_open(&self) -> bool {
        self.file.is_open()
    }

    /// The hash of block 0, which the consumer has to trust before anything else.
    pub fn root_hash(&self) -> Result<Id32> {
        let first = self
            .prepared
            .lengths
            .validate_block_index(0)
            .ok_or(Error::CacheMiss { index: 0 })?;
        self.store.read_hash(&self.prepared.key, first)
    }

    pub fn request(&mut self, request_number: u64) -> Result<Bytes> {
        if self.finished {
            return Err(Error::EndOfStream);
        }
        if request_number == 0 {
            return Ok(Bytes::copy_from_slice(self.root_hash()?.as_bytes()));
        }

        let lengths = self.prepared.lengths;
        let Some(index) = lengths.validate_block_index(request_number - 1) else {
            debug!(request_number, "past the last block, ending stream");
            self.finish();
            return Err(Error::EndOfStream);
        };
        let info = lengths.block_info(index);
        let is_last = lengths.is_last(index);

        let result = self.read_hashed_block(&info, is_last);
        match &result {
            Ok(_) if is_last => {
                debug!(request_number, "served the last block");
                self.finish();
            }
            Ok(_) => trace!(request_number, "served block"),
            Err(_) => self.file.close(),
        }
        result
    }

    fn read_hashed_block(&mut self, info: &BlockInfo, is_last: bool) -> Result<Bytes> {
        if self.buf.is_empty() {
            self.buf = block_buffer(&self.prepared.lengths);
        }
        let block = read_block(self.file.get()?, info, &mut self.buf)?;

        let next = if is_last {
            zero_hash()
        } else {
            let next_index = self
                .prepared
                .lengths
                .validate_block_index(info.index.get() + 1)
                .ok_or(Error::CacheMiss {
                    index: info.index.get() + 1,
                })?;
            self.store.read_hash(&self.prepared.key, next_index)?
        };
        Ok(make_hashed_block(block, &next))
    }

    /// Ends the stream early and releases the file.
    pub fn close(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.finished = true;
        self.file.close();
        self.buf = Vec::new();
    }
}
