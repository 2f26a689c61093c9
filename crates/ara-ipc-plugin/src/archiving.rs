//! Archiving proxy.
//!
//! Reads and writes larger than one frame move in slices. A failed read
//! slice leaves the caller's buffer untouched.

use crate::host_link::HostLink;
use ara_ipc_core::api::ArchivingController;
use ara_ipc_core::refs::{ArchiveReaderHostRef, ArchiveWriterHostRef};
use ara_ipc_core::{AraBool, Selector};
use tracing::{error, warn};

/// Bytes an encoded `Option<Vec<u8>>` reply adds around the archive data.
const READ_REPLY_OVERHEAD: usize = 16;
/// Bytes the write arguments add around the archive data.
const WRITE_ARGS_OVERHEAD: usize = 32;

#[derive(Debug)]
pub struct ArchivingProxy {
    link: HostLink,
}

impl ArchivingProxy {
    pub(crate) fn new(link: HostLink) -> Self {
        Self { link }
    }

    /// Bytes per call once `overhead` is taken off the payload limit.
    fn slice_len(&self, overhead: usize) -> Option<usize> {
        let len = self.link.max_payload_size()?.saturating_sub(overhead);
        if len == 0 {
            error!("frame size limit leaves no room for archive data");
            return None;
        }
        Some(len)
    }

    fn write_slice(&self, writer: ArchiveWriterHostRef, position: u64, data: &[u8]) -> bool {
        self.link
            .call::<_, AraBool>(
                Selector::WriteBytesToArchive,
                &(self.link.controller(), writer, position, data),
            )
            .is_some_and(bool::from)
    }

    fn read_slice(&self, reader: ArchiveReaderHostRef, position: u64, buffer: &mut [u8]) -> bool {
        let data = self.link.call::<_, Option<Vec<u8>>>(
            Selector::ReadBytesFromArchive,
            &(self.link.controller(), reader, position, buffer.len() as u64),
        );
        match data.flatten() {
            Some(data) if data.len() == buffer.len() => {
                buffer.copy_from_slice(&data);
                true
            }
            Some(data) => {
                warn!(expected = buffer.len(), received = data.len(), "short archive read");
                false
            }
            None => false,
        }
    }
}

impl ArchivingController for ArchivingProxy {
    fn get_archive_size(&self, reader: ArchiveReaderHostRef) -> u64 {
        self.link
            .call(Selector::GetArchiveSize, &(self.link.controller(), reader))
            .unwrap_or(0)
    }

    fn read_bytes_from_archive(&self, reader: ArchiveReaderHostRef, position: u64, buffer: &mut [u8]) -> bool {
        let Some(slice_len) = self.slice_len(READ_REPLY_OVERHEAD) else {
            return false;
        };
        if buffer.len() <= slice_len {
            return self.read_slice(reader, position, buffer);
        }
        let mut staged = vec![0u8; buffer.len()];
        let mut offset = 0u64;
        for slice in staged.chunks_mut(slice_len) {
            if !self.read_slice(reader, position + offset, slice) {
                return false;
            }
            offset += slice.len() as u64;
        }
        buffer.copy_from_slice(&staged);
        true
    }

    fn write_bytes_to_archive(&self, writer: ArchiveWriterHostRef, position: u64, data: &[u8]) -> bool {
        let Some(slice_len) = self.slice_len(WRITE_ARGS_OVERHEAD) else {
            return false;
        };
        if data.len() <= slice_len {
            return self.write_slice(writer, position, data);
        }
        let mut offset = 0u64;
        for slice in data.chunks(slice_len) {
            if !self.write_slice(writer, position + offset, slice) {
                return false;
            }
            offset += slice.len() as u64;
        }
        true
    }

    fn notify_document_archiving_progress(&self, value: f32) {
        self.link.notify(
            Selector::NotifyDocumentArchivingProgress,
            &(self.link.controller(), value),
        );
    }

    fn notify_document_unarchiving_progress(&self, value: f32) {
        self.link.notify(
            Selector::NotifyDocumentUnarchivingProgress,
            &(self.link.controller(), value),
        );
    }

    fn get_document_archive_id(&self, reader: ArchiveReaderHostRef) -> Option<String> {
        self.link
            .call::<_, Option<String>>(Selector::GetDocumentArchiveId, &(self.link.controller(), reader))
            .flatten()
    }
}
