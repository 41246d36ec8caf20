use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use phf::phf_map;

use crate::coherence::cache::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    Read,
    Write,
}

static OP_MNEMONICS: phf::Map<&'static str, AccessOp> = phf_map! {
    "r" => AccessOp::Read,
    "read" => AccessOp::Read,
    "ld" => AccessOp::Read,
    "w" => AccessOp::Write,
    "write" => AccessOp::Write,
    "st" => AccessOp::Write,
};

/// One request of an access trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    pub lineno: usize,
    pub op: AccessOp,
    pub processor_id: usize,
    pub address: Address,
}

/// Access trace in program order. Text format is one `<op> <pid> <address>`
/// per line; blank lines and `#` comments are skipped.
#[derive(Debug, Default)]
pub struct Tracer {
    buf: VecDeque<Line>,
}

impl Tracer {
    pub fn from_file(path: &Path) -> anyhow::Result<Tracer> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read trace file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in trace file {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Tracer> {
        let mut buf = VecDeque::new();
        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            if fields.len() != 3 {
                bail!("line {}: expected `<op> <pid> <address>`, got '{}'", lineno, content);
            }
            let op = match OP_MNEMONICS.get(fields[0].to_ascii_lowercase().as_str()) {
                Some(op) => *op,
                None => bail!("line {}: unknown op '{}'", lineno, fields[0]),
            };
            let processor_id = fields[1]
                .parse::<usize>()
                .with_context(|| format!("line {}: bad processor id '{}'", lineno, fields[1]))?;
            let address = parse_address(fields[2])
                .with_context(|| format!("line {}: bad address '{}'", lineno, fields[2]))?;
            buf.push_back(Line {
                lineno,
                op,
                processor_id,
                address,
            });
        }
        Ok(Tracer { buf })
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn consume(&mut self) -> Option<Line> {
        self.buf.pop_front()
    }
}

fn parse_address(field: &str) -> anyhow::Result<Address> {
    if field.starts_with('-') {
        bail!("addresses must be non-negative");
    }
    let address = match field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        Some(hex) => Address::from_str_radix(hex, 16)?,
        None => field.parse::<Address>()?,
    };
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ops_comments_and_hex() {
        let mut trace = Tracer::parse(
            "# warmup\n\
             r 0 12\n\
             \n\
             WRITE 1 0x10   # upgrade\n\
             st 0 3\n",
        )
        .unwrap();
        assert_eq!(trace.len(), 3);
        assert_eq!(
            trace.consume(),
            Some(Line {
                lineno: 2,
                op: AccessOp::Read,
                processor_id: 0,
                address: 12
            })
        );
        let second = trace.consume().unwrap();
        assert_eq!(second.op, AccessOp::Write);
        assert_eq!(second.processor_id, 1);
        assert_eq!(second.address, 16);
        assert_eq!(second.lineno, 4);
        assert_eq!(trace.consume().unwrap().op, AccessOp::Write);
        assert!(trace.consume().is_none());
    }

    #[test]
    fn negative_address_is_rejected() {
        let err = Tracer::parse("r 0 -4\n").unwrap_err();
        assert!(format!("{:#}", err).contains("non-negative"));
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(Tracer::parse("x 0 4\n").is_err());
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        assert!(Tracer::parse("r 0\n").is_err());
        assert!(Tracer::parse("r 0 1 2\n").is_err());
    }
}
