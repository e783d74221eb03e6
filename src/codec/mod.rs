pub mod bitio;
pub mod golomb;

use crate::codec::bitio::{BitReader, BitWriter};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;

pub use golomb::{ExtendedGolombCoder, ParameterizedExpGolombCoder};

/// Variable-length coder for positive integers. Zero is never a legal
/// input; postings store doc-id + 1 and gap deltas.
pub trait Coder: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, value: u64, writer: &mut BitWriter) -> Result<()>;

    fn decode(&self, reader: &mut BitReader) -> Result<u64>;

    fn encode_all(&self, values: &[u64], writer: &mut BitWriter) -> Result<()> {
        for &v in values {
            self.encode(v, writer)?;
        }
        Ok(())
    }

    fn decode_all(&self, reader: &mut BitReader, count: usize) -> Result<Vec<u64>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.decode(reader)?);
        }
        Ok(out)
    }
}

/// Build a coder from its full description, e.g. "ETG:5:2" or "PEG:3"
pub fn create_coder(description: &str) -> Result<Box<dyn Coder>> {
    match description.split_once(':') {
        Some((name, rest)) if name.eq_ignore_ascii_case(ExtendedGolombCoder::NAME) => {
            Ok(Box::new(ExtendedGolombCoder::parse(rest)?))
        }
        Some((name, rest)) if name.eq_ignore_ascii_case(ParameterizedExpGolombCoder::NAME) => {
            Ok(Box::new(ParameterizedExpGolombCoder::parse(rest)?))
        }
        _ => Err(Error::new(
            ErrorKind::BadArgument,
            format!("unknown coder: {}", description),
        )),
    }
}

/// One posting of a term: a document and the in-document hit positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
}

/// Coded posting list. Document ids are stored as gap deltas of id + 1,
/// each position array as its length followed by position gap deltas.
#[derive(Debug, Clone)]
pub struct PostingList {
    data: Vec<u8>,
    doc_count: u32,
}

impl PostingList {
    pub fn encode(postings: &[Posting], coder: &dyn Coder) -> Result<PostingList> {
        let mut w = BitWriter::new();
        let mut prev = 0u64;
        for p in postings {
            let id = p.doc_id.0 as u64 + 1;
            if id <= prev {
                return Err(Error::new(ErrorKind::BadArgument, "postings not sorted"));
            }
            coder.encode(id - prev, &mut w)?;
            prev = id;

            coder.encode(p.positions.len() as u64 + 1, &mut w)?;
            let mut prev_pos = 0u64;
            for &pos in &p.positions {
                let v = pos as u64 + 1;
                if v <= prev_pos {
                    return Err(Error::new(ErrorKind::BadArgument, "positions not sorted"));
                }
                coder.encode(v - prev_pos, &mut w)?;
                prev_pos = v;
            }
        }
        Ok(PostingList {
            data: w.into_bytes(),
            doc_count: postings.len() as u32,
        })
    }

    pub fn decode(&self, coder: &dyn Coder) -> Result<Vec<Posting>> {
        let mut r = BitReader::new(&self.data);
        let mut out = Vec::with_capacity(self.doc_count as usize);
        let mut prev = 0u64;
        for _ in 0..self.doc_count {
            prev += coder.decode(&mut r)?;
            let doc_id = DocId((prev - 1) as u32);

            let count = coder.decode(&mut r)? - 1;
            let mut positions = Vec::with_capacity(count as usize);
            let mut prev_pos = 0u64;
            for _ in 0..count {
                prev_pos += coder.decode(&mut r)?;
                positions.push((prev_pos - 1) as u32);
            }
            out.push(Posting { doc_id, positions });
        }
        Ok(out)
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_coder() {
        assert_eq!(create_coder("ETG:5:2").unwrap().name(), "ETG");
        assert_eq!(create_coder("PEG:3").unwrap().name(), "PEG");
        assert!(create_coder("RLE:3").is_err());
        assert!(create_coder("ETG:77").is_err());
    }

    #[test]
    fn test_posting_list_roundtrip() {
        let coder = create_coder("PEG:2").unwrap();
        let postings = vec![
            Posting { doc_id: DocId(0), positions: vec![0, 5, 9] },
            Posting { doc_id: DocId(3), positions: vec![] },
            Posting { doc_id: DocId(11), positions: vec![2] },
            Posting { doc_id: DocId(49), positions: vec![100, 200] },
        ];
        let list = PostingList::encode(&postings, coder.as_ref()).unwrap();
        assert_eq!(list.doc_count(), 4);
        assert_eq!(list.decode(coder.as_ref()).unwrap(), postings);
    }

    #[test]
    fn test_unsorted_rejected() {
        let coder = create_coder("PEG:2").unwrap();
        let postings = vec![
            Posting { doc_id: DocId(5), positions: vec![] },
            Posting { doc_id: DocId(5), positions: vec![] },
        ];
        assert!(PostingList::encode(&postings, coder.as_ref()).is_err());
    }
}
