//! Writing provisioning state back onto assembly records.
//!
//! Every update rewrites the whole record. There is no locking and no
//! compare-and-swap: two concurrent updates to the same assembly race, and
//! whichever store lands last overwrites the other's changes. Callers that
//! need stronger guarantees must get them from the store.

use std::collections::BTreeMap;

use chrono::{DateTime, Local};
use tracing::{debug, error, instrument};

use carton_shared::types::{LAST_STATUS_UPDATE, STATUS};
use carton_shared::{CartonError, Result, Status};
use carton_storage::RecordStore;

use crate::assembly::{AssemblyRecord, AssemblyStore};

/// RFC 822 with a numeric zone, e.g. `08 Jan 16 11:04 +0530`.
const STATUS_TIME_FORMAT: &str = "%d %b %y %H:%M %z";

/// Wall-clock local timestamp recorded with each status update.
pub fn status_timestamp(now: DateTime<Local>) -> String {
    now.format(STATUS_TIME_FORMAT).to_string()
}

impl<S: RecordStore> AssemblyStore<'_, S> {
    /// Record a new status and persist the record.
    ///
    /// Appends `lastsuccessstatusupdate` and `status` input pairs, leaving
    /// earlier ones in place as history, and sets the top-level status. On a
    /// store failure `record` keeps the in-memory change.
    #[instrument(skip_all, fields(id = %record.id, %status))]
    pub async fn set_status(&self, record: &mut AssemblyRecord, status: Status) -> Result<()> {
        self.set_status_at(record, status, Local::now()).await
    }

    pub(crate) async fn set_status_at(
        &self,
        record: &mut AssemblyRecord,
        status: Status,
        now: DateTime<Local>,
    ) -> Result<()> {
        record.inputs.push(LAST_STATUS_UPDATE, status_timestamp(now));
        record.inputs.push(STATUS, status.as_str());
        record.status = status.to_string();

        if let Err(e) = self.store.store(&self.bucket, &record.id, &*record).await {
            error!(error = %e, "failed to store status update");
            return Err(e);
        }
        Ok(())
    }

    /// Replace the named output keys and persist the record.
    ///
    /// An empty `replacements` map is a caller error and performs no write.
    #[instrument(skip_all, fields(id = %record.id, keys = replacements.len()))]
    pub async fn nuke_and_set_outputs(
        &self,
        record: &mut AssemblyRecord,
        replacements: &BTreeMap<String, Vec<String>>,
    ) -> Result<()> {
        if replacements.is_empty() {
            return Err(CartonError::NoOutputsSupplied);
        }

        debug!(?replacements, "nuke and set outputs");
        record.outputs = record.outputs.nuke_and_set(replacements);

        if let Err(e) = self.store.store(&self.bucket, &record.id, &*record).await {
            error!(error = %e, "failed to store outputs");
            return Err(e);
        }
        Ok(())
    }

    /// Remove the assembly stored under `id`. Components are left alone.
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(&self.bucket, id).await
    }
}
