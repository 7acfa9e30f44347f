//! Schema command - print the accepted statement format

use clap::Args;
use fifotax::revolut::StatementRow;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format
    #[arg(value_enum, default_value = "csv-fields")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema of one statement row
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => {
                let schema = schema_for!(StatementRow);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::CsvHeader => {
                let names: Vec<_> = StatementRow::csv_columns().iter().map(|c| c.name).collect();
                println!("{}", names.join(","));
            }
            SchemaFormat::CsvFields => {
                println!("Statement CSV Format");
                println!("====================");
                println!();
                for column in StatementRow::csv_columns() {
                    let req = if column.required { "required" } else { "optional" };
                    println!("{:20} ({:8})  {}", column.name, req, column.description);
                }
                println!();
                println!("Only BUY and SELL rows are used; other operation types are skipped.");
            }
        }
        Ok(())
    }
}
