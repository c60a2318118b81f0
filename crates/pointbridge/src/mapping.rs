use crate::error::{BridgeError, Result};
use crate::model::{AttributeHandle, Model};
use crate::types::{AttributeKey, Fc, StoreAddress, TypeKind};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

const STORE_MARKER_OPEN: &str = "\"<<<";
const STORE_MARKER_CLOSE: &str = ">>>\"";

/// One store-originated line of the point map, before model resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRecord {
    /// 1-based line number, for log lines
    pub line: usize,
    pub logical_device: String,
    pub descriptor: String,
    pub store_address: String,
}

impl PointRecord {
    /// Split the descriptor into a full object reference and its fc
    ///
    /// `MMXU1$MX$Amp$mag$f` under `LD1` becomes `LD1/MMXU1.Amp.mag.f` + `MX`.
    pub fn model_path(&self) -> Result<(String, Fc)> {
        let segments: Vec<&str> = self.descriptor.split('$').collect();
        if segments.len() < 3 {
            return Err(BridgeError::Resolution(format!(
                "descriptor '{}' has fewer than 3 segments",
                self.descriptor
            )));
        }

        let fc: Fc = segments[1].parse()?;
        let path = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, s)| *s)
            .collect::<Vec<_>>()
            .join(".");

        Ok((format!("{}/{}", self.logical_device, path), fc))
    }
}

/// Parse the text of a point map
///
/// Only lines whose third field is `"<<<address>>>"` are returned; comment,
/// blank and model-only lines are skipped.
pub fn parse_point_map(text: &str) -> Vec<PointRecord> {
    let mut records = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            continue;
        }

        let directive = fields[2].trim();
        let address = match directive
            .strip_prefix(STORE_MARKER_OPEN)
            .and_then(|s| s.strip_suffix(STORE_MARKER_CLOSE))
        {
            Some(address) => address,
            None => continue,
        };

        records.push(PointRecord {
            line: idx + 1,
            logical_device: fields[0].trim().to_string(),
            descriptor: fields[1].trim().to_string(),
            store_address: address.to_string(),
        });
    }

    records
}

/// Read and parse a point map file. An unreadable file is fatal.
pub fn load_point_map<P: AsRef<Path>>(path: P) -> Result<Vec<PointRecord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::Config(format!("cannot read point map {:?}: {}", path, e)))?;
    let records = parse_point_map(&text);
    debug!("Point map {:?}: {} store-originated records", path, records.len());
    Ok(records)
}

/// One configured point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub store_address: StoreAddress,
    pub handle: AttributeHandle,
}

impl MappingEntry {
    pub fn kind(&self) -> &TypeKind {
        self.handle.kind()
    }
}

/// Bidirectional index between store addresses and model attributes
///
/// Built once at startup and read-only afterwards, so it can be shared
/// between the synchronizer and the relay without locking.
#[derive(Debug, Default)]
pub struct MappingTable {
    by_store: HashMap<StoreAddress, MappingEntry>,
    by_model: HashMap<AttributeKey, StoreAddress>,
}

impl MappingTable {
    /// Resolve every record against the model
    ///
    /// Records that cannot be resolved are dropped with a warning.
    pub fn build<M: Model + ?Sized>(records: &[PointRecord], model: &M) -> Self {
        let mut table = MappingTable::default();

        for record in records {
            match Self::resolve(record, model) {
                Ok(entry) => table.insert(entry, record.line),
                Err(e) => warn!("Point map line {}: dropped ({})", record.line, e),
            }
        }

        info!("Mapping table built with {} points", table.len());
        table
    }

    fn resolve<M: Model + ?Sized>(record: &PointRecord, model: &M) -> Result<MappingEntry> {
        let store_address = StoreAddress::parse(&record.store_address)?;
        let (reference, fc) = record.model_path()?;

        let handle = model.resolve_attribute(&reference, fc).ok_or_else(|| {
            BridgeError::Resolution(format!("no model attribute {} [{}]", reference, fc))
        })?;

        if let TypeKind::Unsupported(name) = handle.kind() {
            warn!(
                "{} [{}] has type {} which cannot be synchronized",
                reference, fc, name
            );
        }

        Ok(MappingEntry {
            store_address,
            handle,
        })
    }

    /// Later lines win per store address. Several addresses may feed the
    /// same attribute; writes go back to the last one listed.
    fn insert(&mut self, entry: MappingEntry, line: usize) {
        let key = entry.handle.key().clone();

        if let Some(previous) = self.by_store.remove(&entry.store_address) {
            warn!(
                "Point map line {}: {} remapped from {}",
                line,
                entry.store_address,
                previous.handle.key()
            );
            let previous_key = previous.handle.key();
            if self.by_model.get(previous_key) == Some(&entry.store_address) {
                self.by_model.remove(previous_key);
            }
        }
        if let Some(previous) = self.by_model.insert(key, entry.store_address.clone()) {
            if previous != entry.store_address {
                warn!(
                    "Point map line {}: writes to {} now go to {} instead of {}",
                    line,
                    entry.handle.key(),
                    entry.store_address,
                    previous
                );
            }
        }

        self.by_store.insert(entry.store_address.clone(), entry);
    }

    pub fn by_store_address(&self, address: &StoreAddress) -> Option<&MappingEntry> {
        self.by_store.get(address)
    }

    pub fn by_attribute(&self, key: &AttributeKey) -> Option<&MappingEntry> {
        self.by_model
            .get(key)
            .and_then(|address| self.by_store.get(address))
    }

    pub fn entries(&self) -> impl Iterator<Item = &MappingEntry> {
        self.by_store.values()
    }

    pub fn len(&self) -> usize {
        self.by_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemoryModel;

    fn model() -> MemoryModel {
        let model = MemoryModel::new();
        model.define("LD1/MMXU1.Amp.mag.f", Fc::Mx, TypeKind::Float32);
        model.define("LD1/XCBR1.Pos.stVal", Fc::St, TypeKind::DoubleBitPos);
        model.define("LD1/GGIO1.Ind1.stVal", Fc::St, TypeKind::Unsupported("BOOLEAN".into()));
        model
    }

    #[test]
    fn test_parse_store_originated_lines_only() {
        let text = "# comment\n\
                    LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:amp>>>\"\n\
                    LD1\tXCBR1$ST$Pos$stVal\t\">>>out:pos<<<\"\n\
                    LD1\tXCBR1$CO$Pos$Oper$ctlVal\n\
                    \n\
                    LD1\tXCBR1$ST$Pos$stVal\t\"<<<rec1/pos>>>\"\textra\n";
        let records = parse_point_map(text);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].store_address, "meas:amp");
        assert_eq!(records[0].line, 2);
        assert_eq!(records[1].store_address, "rec1/pos");
    }

    #[test]
    fn test_model_path_from_descriptor() {
        let record = PointRecord {
            line: 1,
            logical_device: "LD1".to_string(),
            descriptor: "MMXU1$MX$Amp$mag$f".to_string(),
            store_address: "meas:amp".to_string(),
        };
        let (reference, fc) = record.model_path().unwrap();
        assert_eq!(reference, "LD1/MMXU1.Amp.mag.f");
        assert_eq!(fc, Fc::Mx);
    }

    #[test]
    fn test_short_descriptor_is_rejected() {
        let record = PointRecord {
            line: 1,
            logical_device: "LD1".to_string(),
            descriptor: "MMXU1$MX".to_string(),
            store_address: "x".to_string(),
        };
        assert!(matches!(
            record.model_path(),
            Err(BridgeError::Resolution(_))
        ));
    }

    #[test]
    fn test_build_indexes_both_directions() {
        let records = parse_point_map("LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:amp>>>\"\n");
        let table = MappingTable::build(&records, &model());

        let address = StoreAddress::Key("meas:amp".to_string());
        let entry = table.by_store_address(&address).unwrap();
        assert_eq!(entry.handle.reference(), "LD1/MMXU1.Amp.mag.f");
        assert_eq!(entry.handle.fc(), Fc::Mx);
        assert_eq!(entry.kind(), &TypeKind::Float32);

        let key = AttributeKey::new("LD1/MMXU1.Amp.mag.f", Fc::Mx);
        assert_eq!(table.by_attribute(&key).unwrap().store_address, address);
    }

    #[test]
    fn test_build_drops_unresolvable_entries() {
        let text = "LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:amp>>>\"\n\
                    LD1\tMMXU9$MX$Amp$mag$f\t\"<<<meas:missing>>>\"\n\
                    LD1\tMMXU1$QQ$Amp$mag$f\t\"<<<meas:badfc>>>\"\n\
                    LD1\tMMXU1$MX\t\"<<<meas:short>>>\"\n\
                    LD1\tXCBR1$ST$Pos$stVal\t\"<<<rec1/>>>\"\n";
        let table = MappingTable::build(&parse_point_map(text), &model());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unsupported_type_is_kept() {
        let text = "LD1\tGGIO1$ST$Ind1$stVal\t\"<<<ind1>>>\"\n";
        let table = MappingTable::build(&parse_point_map(text), &model());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_later_line_wins_for_same_address() {
        let text = "LD1\tMMXU1$MX$Amp$mag$f\t\"<<<shared>>>\"\n\
                    LD1\tXCBR1$ST$Pos$stVal\t\"<<<shared>>>\"\n";
        let table = MappingTable::build(&parse_point_map(text), &model());

        assert_eq!(table.len(), 1);
        let entry = table
            .by_store_address(&StoreAddress::Key("shared".to_string()))
            .unwrap();
        assert_eq!(entry.kind(), &TypeKind::DoubleBitPos);
        assert!(table
            .by_attribute(&AttributeKey::new("LD1/MMXU1.Amp.mag.f", Fc::Mx))
            .is_none());
    }

    #[test]
    fn test_two_addresses_feed_one_attribute() {
        let text = "LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:a>>>\"\n\
                    LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:b>>>\"\n";
        let table = MappingTable::build(&parse_point_map(text), &model());

        assert_eq!(table.len(), 2);
        for address in ["meas:a", "meas:b"] {
            let entry = table
                .by_store_address(&StoreAddress::Key(address.to_string()))
                .unwrap();
            assert_eq!(entry.handle.reference(), "LD1/MMXU1.Amp.mag.f");
        }
        let key = AttributeKey::new("LD1/MMXU1.Amp.mag.f", Fc::Mx);
        assert_eq!(
            table.by_attribute(&key).unwrap().store_address,
            StoreAddress::Key("meas:b".to_string())
        );
    }

    #[test]
    fn test_readdressed_line_keeps_write_target_of_other_line() {
        let text = "LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:a>>>\"\n\
                    LD1\tMMXU1$MX$Amp$mag$f\t\"<<<meas:b>>>\"\n\
                    LD1\tXCBR1$ST$Pos$stVal\t\"<<<meas:a>>>\"\n";
        let table = MappingTable::build(&parse_point_map(text), &model());

        assert_eq!(table.len(), 2);
        let amp = AttributeKey::new("LD1/MMXU1.Amp.mag.f", Fc::Mx);
        assert_eq!(
            table.by_attribute(&amp).unwrap().store_address,
            StoreAddress::Key("meas:b".to_string())
        );
        let pos = AttributeKey::new("LD1/XCBR1.Pos.stVal", Fc::St);
        assert_eq!(
            table.by_attribute(&pos).unwrap().store_address,
            StoreAddress::Key("meas:a".to_string())
        );
    }

    #[test]
    fn test_load_point_map_missing_file() {
        assert!(matches!(
            load_point_map("/nonexistent/datamap.txt"),
            Err(BridgeError::Config(_))
        ));
    }
}
