//! Command-line interface for xmlschema-core
//!
//! Exit status: 0 when the document is valid, 1 when validation errors
//! were found, 2 when the schema or the input could not be read.

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
use xmlschema_core::{
    from_json, to_json, ConverterConfig, DecodeOptions, Error, Schema, ValidationError, ValidationMode,
};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xmlschema-core")]
#[command(author, version, about = "XML Schema validation and conversion tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate an XML document against an XSD schema
    Validate {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Validation mode: strict, lax or skip
        #[arg(short, long, default_value = "lax")]
        mode: ValidationMode,
    },

    /// Decode an XML document and print it as JSON
    #[command(name = "xml2json")]
    XmlToJson {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Path to the XML file to convert
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Validation mode: strict, lax or skip
        #[arg(short, long, default_value = "strict")]
        mode: ValidationMode,

        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encode JSON data as an XML element
    #[command(name = "json2xml")]
    JsonToXml {
        /// Path to the XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Name of the global element to encode
        #[arg(short, long)]
        element: String,

        /// Path to the JSON file to convert
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Validation mode: strict, lax or skip
        #[arg(short, long, default_value = "strict")]
        mode: ValidationMode,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
type CliResult = Result<ExitCode, Box<dyn std::error::Error>>;

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Validate { schema, file, mode } => cmd_validate(schema, file, mode),
        Commands::XmlToJson {
            schema,
            file,
            mode,
            pretty,
            output,
        } => cmd_xml2json(schema, file, mode, pretty, output),
        Commands::JsonToXml {
            schema,
            element,
            file,
            mode,
            output,
        } => cmd_json2xml(schema, element, file, mode, output),
    };

    match result {
        Ok(code) => code,
        Err(e) => match e.downcast_ref::<Error>() {
            Some(Error::Validation(_)) | Some(Error::Coercion(_)) => {
                eprintln!("Invalid: {}", e);
                ExitCode::from(1)
            }
            _ => {
                eprintln!("Error: {}", e);
                ExitCode::from(2)
            }
        },
    }
}

#[cfg(feature = "cli")]
fn converter_config(schema: &Schema) -> ConverterConfig {
    let mut namespaces = schema.namespaces().clone();
    if let Some(tns) = schema.target_namespace() {
        namespaces.set_default_namespace(tns);
    }
    namespaces.add_prefix("xsi", xmlschema_core::XSI_NAMESPACE);
    ConverterConfig::new().with_namespaces(namespaces)
}

#[cfg(feature = "cli")]
fn report(errors: &[ValidationError]) -> ExitCode {
    for error in errors {
        eprintln!("{}", error);
    }
    if errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

#[cfg(feature = "cli")]
fn write_output(text: &str, output: Option<PathBuf>) -> std::io::Result<()> {
    match output {
        Some(path) => fs::write(path, text),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

#[cfg(feature = "cli")]
fn cmd_validate(schema_path: PathBuf, file: PathBuf, mode: ValidationMode) -> CliResult {
    let schema = Schema::from_file(&schema_path)?;
    let xml_content = fs::read_to_string(&file)?;
    let decoded = schema.decode_str(&xml_content, &DecodeOptions::new(mode))?;

    if decoded.is_valid() {
        println!("{} is valid", file.display());
    }
    Ok(report(&decoded.errors))
}

#[cfg(feature = "cli")]
fn cmd_xml2json(
    schema_path: PathBuf,
    file: PathBuf,
    mode: ValidationMode,
    pretty: bool,
    output: Option<PathBuf>,
) -> CliResult {
    let schema = Schema::from_file(&schema_path)?;
    let xml_content = fs::read_to_string(&file)?;
    let decoded = schema.decode_str(&xml_content, &DecodeOptions::new(mode))?;

    let json = decoded
        .value
        .as_ref()
        .map(|value| to_json(value, &converter_config(&schema)))
        .unwrap_or(serde_json::Value::Null);
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    write_output(&text, output)?;
    Ok(report(&decoded.errors))
}

#[cfg(feature = "cli")]
fn cmd_json2xml(
    schema_path: PathBuf,
    element: String,
    file: PathBuf,
    mode: ValidationMode,
    output: Option<PathBuf>,
) -> CliResult {
    let schema = Schema::from_file(&schema_path)?;
    let data: serde_json::Value = serde_json::from_str(&fs::read_to_string(&file)?)?;
    let config = converter_config(&schema);

    let name = config.element_name(&element);
    let value = from_json(&data, &config);
    let encoded = schema.encode(&value, &name, &DecodeOptions::new(mode))?;
    if let Some(elem) = &encoded.value {
        write_output(&elem.to_xml_string()?, output)?;
    }
    Ok(report(&encoded.errors))
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    std::process::exit(2);
}
