use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::gstar::Support;

/// Strip BEAST annotations from Newick strings.
///
/// BEAST writes annotations like `:[&rate=0.123]2.45` where 2.45 is the
/// branch length. The `[&...]` blocks are removed and everything else is kept.
pub fn strip_beast_annotations(newick: &str) -> String {
    let mut result = String::with_capacity(newick.len());
    let mut in_annotation = false;
    let mut chars = newick.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '[' && chars.peek() == Some(&'&') {
            in_annotation = true;
        } else if ch == ']' && in_annotation {
            in_annotation = false;
        } else if !in_annotation {
            result.push(ch);
        }
    }

    result
}

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

/// Read one Newick tree per line from a plain or `.gz` file.
///
/// Blank lines and lines starting with `#` are skipped, BEAST annotations
/// are stripped. Trees are not parsed here.
pub fn read_newick_lines<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let p = path.as_ref();
    let file = File::open(p)?;
    let reader: Box<dyn Read> = if is_gz(p) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    newick_lines(BufReader::new(reader))
}

/// Newick lines from any buffered reader; see [`read_newick_lines`].
pub fn newick_lines<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut trees = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        trees.push(strip_beast_annotations(line));
    }
    Ok(trees)
}

/// Open a writer for the per-trial schedule log.
/// If `path` ends with `.gz`, the output is gzip-compressed.
/// Writing to stdout (`-`) is not supported.
pub fn create_log_writer<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn Write>> {
    let p = path.as_ref();
    if p.as_os_str() == "-" {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "writing to stdout is not supported by create_log_writer",
        ));
    }

    let f = File::create(p)?;
    let out: Box<dyn Write> = if is_gz(p) {
        Box::new(BufWriter::new(GzEncoder::new(f, Compression::default())))
    } else {
        Box::new(BufWriter::new(f))
    };
    Ok(out)
}

/// Write the support table as TSV (`topology`, `support`), highest support first.
/// If `path` ends with `.gz`, the output is gzip-compressed.
pub fn write_support_tsv<P: AsRef<Path>>(path: P, support: &Support) -> io::Result<()> {
    let mut out = create_log_writer(path)?;
    write_support(&mut out, support)?;
    out.flush()
}

/// Write the support table as TSV to any writer.
pub fn write_support<W: Write + ?Sized>(out: &mut W, support: &Support) -> io::Result<()> {
    writeln!(out, "topology\tsupport")?;
    for (topology, ratio) in support.entries() {
        writeln!(out, "{topology}\t{ratio}")?;
    }
    Ok(())
}
