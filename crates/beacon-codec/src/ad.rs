//! Advertising-data (AD) structure primitives.
//!
//! Advertising data is a sequence of `[len][type][data ...]` records where
//! `len` counts the type byte plus the data.

/// AD structure type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdType(u8);

impl AdType {
    pub const FLAGS: AdType = AdType(0x01);
    pub const MANUFACTURER_SPECIFIC_DATA: AdType = AdType(0xff);

    pub const fn to_u8(self) -> u8 {
        self.0
    }
}

/// Flags bit: LE General Discoverable Mode.
pub const FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
/// Flags bit: BR/EDR Not Supported.
pub const FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// One borrowed AD structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdStructure<'a> {
    pub ad_type: AdType,
    pub data: &'a [u8],
}

/// Iterator over the AD structures in an advertising payload.
///
/// Zero-length records are skipped. Iteration stops at the first record
/// whose declared length runs past the end of the buffer.
#[derive(Debug, Clone)]
pub struct AdIter<'a> {
    rest: &'a [u8],
}

pub fn iter(ad: &[u8]) -> AdIter<'_> {
    AdIter { rest: ad }
}

impl<'a> Iterator for AdIter<'a> {
    type Item = AdStructure<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (&len, tail) = self.rest.split_first()?;
            let len = len as usize;
            if len == 0 {
                self.rest = tail;
                continue;
            }
            if len > tail.len() {
                self.rest = &[];
                return None;
            }
            let (record, rest) = tail.split_at(len);
            self.rest = rest;
            return Some(AdStructure {
                ad_type: AdType(record[0]),
                data: &record[1..],
            });
        }
    }
}

/// Returns the first manufacturer-specific record as `(company_id, body)`.
pub fn manufacturer_data(ad: &[u8]) -> Option<(u16, &[u8])> {
    iter(ad)
        .filter(|s| s.ad_type == AdType::MANUFACTURER_SPECIFIC_DATA)
        .find_map(|s| {
            if s.data.len() < 2 {
                return None;
            }
            Some((u16::from_le_bytes([s.data[0], s.data[1]]), &s.data[2..]))
        })
}

/// Returns the flags byte if the payload carries a flags record.
pub fn flags(ad: &[u8]) -> Option<u8> {
    iter(ad)
        .find(|s| s.ad_type == AdType::FLAGS)
        .and_then(|s| s.data.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_well_formed_records() {
        let ad = [0x02, 0x01, 0x06, 0x03, 0xFF, 0x4C, 0x00];
        let records: Vec<_> = iter(&ad).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ad_type, AdType::FLAGS);
        assert_eq!(records[0].data, &[0x06]);
        assert_eq!(records[1].ad_type, AdType::MANUFACTURER_SPECIFIC_DATA);
        assert_eq!(manufacturer_data(&ad), Some((0x004C, &[][..])));
        assert_eq!(flags(&ad), Some(0x06));
    }

    #[test]
    fn type_codes_match_assigned_numbers() {
        assert_eq!(AdType::FLAGS.to_u8(), 0x01);
        assert_eq!(AdType::MANUFACTURER_SPECIFIC_DATA.to_u8(), 0xFF);
        assert_eq!(FLAG_LE_GENERAL_DISCOVERABLE | FLAG_BR_EDR_NOT_SUPPORTED, 0x06);
    }

    #[test]
    fn skips_zero_length_padding() {
        let ad = [0x00, 0x00, 0x02, 0x01, 0x06, 0x00];
        assert_eq!(iter(&ad).count(), 1);
    }

    #[test]
    fn stops_on_truncated_record() {
        let ad = [0x02, 0x01, 0x06, 0x1A, 0xFF, 0x4C];
        let records: Vec<_> = iter(&ad).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(manufacturer_data(&ad), None);
    }

    #[test]
    fn short_manufacturer_record_is_ignored() {
        let ad = [0x02, 0xFF, 0x4C];
        assert_eq!(manufacturer_data(&ad), None);
        assert_eq!(flags(&ad), None);
    }
}
