//! Persistence layer: one sled tree per entity, records encoded as CBOR
use super::allocation::{LeaveAllocation, LeaveType};
use super::attachment::StoredAttachment;
use super::employee::Employee;
use super::error::StoreError;
use super::leave::LeaveRequest;
use sled::Transactional;
use sled::transaction::ConflictableTransactionError;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

/// A value that lives in its own tree, keyed by its id.
pub trait Record: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()> {
    const TREE: &'static str;

    fn id(&self) -> &str;
}

/// Typed view over a single sled tree.
pub struct Table<R> {
    tree: sled::Tree,
    _record: PhantomData<R>,
}

impl<R: Record> Table<R> {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            tree: db.open_tree(R::TREE)?,
            _record: PhantomData,
        })
    }

    fn encode(record: &R) -> Result<Vec<u8>, StoreError> {
        minicbor::to_vec(record).map_err(|e| StoreError::Encode(e.to_string()))
    }

    /// Insert a new record, refusing to overwrite an existing id.
    pub fn create(&self, record: &R) -> Result<(), StoreError> {
        let cbor = Self::encode(record)?;
        self.tree
            .compare_and_swap(record.id().as_bytes(), None as Option<&[u8]>, Some(cbor))?
            .map_err(|_| StoreError::Duplicate {
                tree: R::TREE,
                id: record.id().to_string(),
            })
    }

    pub fn get(&self, id: &str) -> Result<Option<R>, StoreError> {
        match self.tree.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Like [`Table::get`] but a missing id is an error.
    pub fn read(&self, id: &str) -> Result<R, StoreError> {
        self.get(id)?.ok_or_else(|| StoreError::Missing {
            tree: R::TREE,
            id: id.to_string(),
        })
    }

    /// Replace an existing record.
    pub fn write(&self, record: &R) -> Result<(), StoreError> {
        if !self.tree.contains_key(record.id().as_bytes())? {
            return Err(StoreError::Missing {
                tree: R::TREE,
                id: record.id().to_string(),
            });
        }
        self.tree.insert(record.id().as_bytes(), Self::encode(record)?)?;
        Ok(())
    }

    /// Returns whether a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.tree.remove(id.as_bytes())?.is_some())
    }

    pub fn find<F>(&self, filter: F) -> Result<Vec<R>, StoreError>
    where
        F: Fn(&R) -> bool,
    {
        let mut found = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let record: R = minicbor::decode(&bytes)?;
            if filter(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// Filter, sort, then page through the matches.
    pub fn find_ordered<F, O>(
        &self,
        filter: F,
        order: O,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<R>, StoreError>
    where
        F: Fn(&R) -> bool,
        O: FnMut(&R, &R) -> Ordering,
    {
        let mut found = self.find(filter)?;
        found.sort_by(order);
        let paged = found.into_iter().skip(offset);
        Ok(match limit {
            Some(limit) => paged.take(limit).collect(),
            None => paged.collect(),
        })
    }

    pub fn find_one<F>(&self, filter: F) -> Result<Option<R>, StoreError>
    where
        F: Fn(&R) -> bool,
    {
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            let record: R = minicbor::decode(&bytes)?;
            if filter(&record) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    pub fn count<F>(&self, filter: F) -> Result<usize, StoreError>
    where
        F: Fn(&R) -> bool,
    {
        Ok(self.find(filter)?.len())
    }
}

/// All tables of the leave system over one shared database.
pub struct LeaveStore {
    instance: Arc<sled::Db>,
    pub employees: Table<Employee>,
    pub leave_types: Table<LeaveType>,
    pub allocations: Table<LeaveAllocation>,
    pub leaves: Table<LeaveRequest>,
    pub attachments: Table<StoredAttachment>,
}

impl LeaveStore {
    pub fn open(instance: Arc<sled::Db>) -> Result<Self, StoreError> {
        Ok(Self {
            employees: Table::open(&instance)?,
            leave_types: Table::open(&instance)?,
            allocations: Table::open(&instance)?,
            leaves: Table::open(&instance)?,
            attachments: Table::open(&instance)?,
            instance,
        })
    }

    pub fn flush(&self) -> Result<usize, StoreError> {
        Ok(self.instance.flush()?)
    }

    /// Inserts a new leave request together with its attachment, if any.
    /// Either both land or neither does.
    pub fn create_leave(
        &self,
        leave: &LeaveRequest,
        attachment: Option<&StoredAttachment>,
    ) -> Result<(), StoreError> {
        let leave_cbor = Table::<LeaveRequest>::encode(leave)?;
        let attachment_cbor = attachment.map(Table::<StoredAttachment>::encode).transpose()?;

        (&self.leaves.tree, &self.attachments.tree).transaction(|(leaves, attachments)| {
            if leaves.get(leave.id.as_bytes())?.is_some() {
                return Err(ConflictableTransactionError::Abort(StoreError::Duplicate {
                    tree: LeaveRequest::TREE,
                    id: leave.id.clone(),
                }));
            }
            leaves.insert(leave.id.as_bytes(), leave_cbor.as_slice())?;
            if let (Some(attachment), Some(cbor)) = (attachment, attachment_cbor.as_ref()) {
                if attachments.get(attachment.id.as_bytes())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StoreError::Duplicate {
                        tree: StoredAttachment::TREE,
                        id: attachment.id.clone(),
                    }));
                }
                attachments.insert(attachment.id.as_bytes(), cbor.as_slice())?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Removes a leave request and every attachment stored against it in
    /// one transaction. Returns whether the request existed.
    pub fn delete_leave(&self, leave_id: &str) -> Result<bool, StoreError> {
        let attachment_ids: Vec<String> = self
            .attachments
            .find(|a| a.leave_id == leave_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();

        let removed = (&self.leaves.tree, &self.attachments.tree).transaction(|(leaves, attachments)| {
            if leaves.remove(leave_id.as_bytes())?.is_none() {
                return Ok(false);
            }
            for id in &attachment_ids {
                attachments.remove(id.as_bytes())?;
            }
            Ok::<_, ConflictableTransactionError<StoreError>>(true)
        })?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
    struct Note {
        #[n(0)]
        id: String,
        #[n(1)]
        rank: u32,
    }

    impl Record for Note {
        const TREE: &'static str = "notes";
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, rank: u32) -> Note {
        Note {
            id: id.to_string(),
            rank,
        }
    }

    #[test]
    fn create_refuses_duplicates_and_write_requires_existing() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let db = sled::open(temp_dir.path().join("table.db"))?;
        let table: Table<Note> = Table::open(&db)?;

        table.create(&note("a", 1))?;
        assert!(matches!(
            table.create(&note("a", 2)),
            Err(StoreError::Duplicate { .. })
        ));
        assert!(matches!(
            table.write(&note("b", 2)),
            Err(StoreError::Missing { .. })
        ));

        table.write(&note("a", 7))?;
        assert_eq!(table.read("a")?.rank, 7);
        assert!(table.delete("a")?);
        assert!(table.get("a")?.is_none());
        Ok(())
    }

    #[test]
    fn find_ordered_sorts_and_pages() -> anyhow::Result<()> {
        let temp_dir = tempdir()?;
        let db = sled::open(temp_dir.path().join("table.db"))?;
        let table: Table<Note> = Table::open(&db)?;

        for (id, rank) in [("a", 3), ("b", 1), ("c", 5), ("d", 2)] {
            table.create(&note(id, rank))?;
        }

        let page = table.find_ordered(|n| n.rank > 1, |a, b| b.rank.cmp(&a.rank), Some(2), 1)?;
        let ranks: Vec<u32> = page.iter().map(|n| n.rank).collect();
        assert_eq!(ranks, vec![3, 2]);
        assert_eq!(table.count(|n| n.rank >= 2)?, 3);
        Ok(())
    }
}
