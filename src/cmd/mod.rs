pub mod report;
pub mod schema;

use fifotax::revolut;
use fifotax::Transaction;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read trades from a statement file (or stdin with "-")
pub fn read_transactions(path: &Path) -> anyhow::Result<Vec<Transaction>> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        let file = File::open(path)?;
        Ok(revolut::read_csv(BufReader::new(file))?)
    }
}

fn read_from_stdin() -> anyhow::Result<Vec<Transaction>> {
    let mut buffer = Vec::new();
    io::stdin().lock().read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a statement file or pipe it to stdin.");
    }

    Ok(revolut::read_csv(io::Cursor::new(buffer))?)
}
