use crate::error::LedgerError;
use crate::models::{Ledger, Offer};
use crate::storage::{ObjectStore, Precondition, Version};
use tracing::{info, warn};

const BOM: &[u8] = b"\xEF\xBB\xBF";
const DELIMITER: u8 = b';';
pub const HEADER: [&str; 4] = ["timestamp", "price", "title", "url"];

/// Serializes the ledger as `;`-separated CSV with a leading UTF-8 BOM.
pub fn encode(ledger: &Ledger) -> Result<Vec<u8>, LedgerError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(BOM.to_vec());

    // Written by hand so an empty ledger still carries its columns.
    writer.write_record(HEADER)?;
    for offer in ledger.offers() {
        writer.serialize(offer)?;
    }

    writer
        .into_inner()
        .map_err(|e| LedgerError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Ledger, LedgerError> {
    let body = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(body);

    let offers = reader
        .deserialize::<Offer>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Ledger::from_offers(offers))
}

/// A loaded ledger and the revision it was read at.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub ledger: Ledger,
    pub version: Version,
}

/// Reads and writes the ledger object as a whole.
pub struct LedgerStore<'a> {
    store: &'a dyn ObjectStore,
    key: String,
}

impl<'a> LedgerStore<'a> {
    pub fn new(store: &'a dyn ObjectStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Loads the ledger. If it does not exist yet an empty one is written
    /// first, so the object always exists once this returns.
    pub fn load(&self) -> Result<Snapshot, LedgerError> {
        info!(key = %self.key, "Loading ledger");
        match self.store.get(&self.key) {
            Ok((bytes, version)) => {
                let ledger = decode(&bytes)?;
                info!(key = %self.key, offers = ledger.len(), "Loaded ledger");
                Ok(Snapshot { ledger, version })
            }
            Err(e) if e.is_missing() => {
                warn!(key = %self.key, error = %e, "Ledger does not exist, initializing empty ledger");
                let ledger = Ledger::new();
                let version = self.save(&ledger, Precondition::Absent)?;
                Ok(Snapshot { ledger, version })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, ledger: &Ledger, precondition: Precondition) -> Result<Version, LedgerError> {
        let bytes = encode(ledger)?;
        let version = self.store.put(&self.key, &bytes, precondition)?;
        info!(key = %self.key, offers = ledger.len(), "Saved ledger");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn sample() -> Ledger {
        Ledger::from_offers(vec![
            Offer::new(
                "2024-05-01 08:00:00",
                "Haus; mit Garten",
                "https://www.kleinanzeigen.de/s-anzeige/1",
                "180.000 € VB",
            ),
            Offer::new(
                "2024-05-01 08:00:00",
                "Resthof \"Am Bach\"",
                "https://www.kleinanzeigen.de/s-anzeige/2",
                "250.000 €",
            ),
        ])
    }

    #[test]
    fn encoded_ledger_has_bom_and_header() {
        let bytes = encode(&Ledger::new()).unwrap();
        assert!(bytes.starts_with(BOM));
        assert_eq!(&bytes[BOM.len()..], b"timestamp;price;title;url\n");
    }

    #[test]
    fn rows_follow_header_column_order() {
        let bytes = encode(&sample()).unwrap();
        let text = String::from_utf8(bytes[BOM.len()..].to_vec()).unwrap();
        let second = text.lines().nth(1).unwrap();
        assert_eq!(
            second,
            "2024-05-01 08:00:00;180.000 € VB;\"Haus; mit Garten\";https://www.kleinanzeigen.de/s-anzeige/1"
        );
    }

    #[test]
    fn round_trip_preserves_rows_and_order() {
        for ledger in [Ledger::new(), sample()] {
            let decoded = decode(&encode(&ledger).unwrap()).unwrap();
            assert_eq!(decoded, ledger);
        }
    }

    #[test]
    fn decodes_without_bom() {
        let ledger = decode(b"timestamp;price;title;url\nt;1 \xE2\x82\xAC;Haus;https://x\n").unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.offers()[0].price, "1 €");
    }

    #[test]
    fn first_load_persists_empty_ledger() {
        let store = MemoryStore::new();
        let ledgers = LedgerStore::new(&store, "crawld.csv");

        let snapshot = ledgers.load().unwrap();

        assert!(snapshot.ledger.is_empty());
        assert_eq!(store.put_count(), 1);
        assert_eq!(store.object("crawld.csv").unwrap(), encode(&Ledger::new()).unwrap());
    }

    #[test]
    fn save_of_load_is_equivalent() {
        let store = MemoryStore::with_object("crawld.csv", encode(&sample()).unwrap());
        let ledgers = LedgerStore::new(&store, "crawld.csv");

        let snapshot = ledgers.load().unwrap();
        ledgers
            .save(&snapshot.ledger, Precondition::Matches(snapshot.version))
            .unwrap();

        assert_eq!(ledgers.load().unwrap().ledger, sample());
    }

    #[test]
    fn forbidden_read_bootstraps_empty_ledger() {
        use crate::error::StoreError;
        use std::cell::RefCell;

        #[derive(Default)]
        struct Denied {
            puts: RefCell<Vec<Precondition>>,
        }
        impl ObjectStore for Denied {
            fn get(&self, key: &str) -> Result<(Vec<u8>, Version), StoreError> {
                Err(StoreError::Forbidden(key.to_string()))
            }
            fn put(&self, _: &str, bytes: &[u8], precondition: Precondition) -> Result<Version, StoreError> {
                assert_eq!(bytes, encode(&Ledger::new()).unwrap());
                self.puts.borrow_mut().push(precondition);
                Ok(Version("1".to_string()))
            }
        }

        let store = Denied::default();
        let snapshot = LedgerStore::new(&store, "crawld.csv").load().unwrap();

        assert!(snapshot.ledger.is_empty());
        assert_eq!(snapshot.version, Version("1".to_string()));
        assert_eq!(*store.puts.borrow(), vec![Precondition::Absent]);
    }

    #[test]
    fn other_storage_errors_propagate() {
        struct Broken;
        impl ObjectStore for Broken {
            fn get(&self, key: &str) -> Result<(Vec<u8>, Version), crate::error::StoreError> {
                Err(crate::error::StoreError::Io {
                    key: key.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk on fire"),
                })
            }
            fn put(&self, _: &str, _: &[u8], _: Precondition) -> Result<Version, crate::error::StoreError> {
                panic!("must not write after a failed read");
            }
        }

        let err = LedgerStore::new(&Broken, "crawld.csv").load().unwrap_err();
        assert!(matches!(err, LedgerError::Store(crate::error::StoreError::Io { .. })));
    }
}
