use anyhow::Result;
use clap::{Parser, Subcommand};
use ocrhl::breaks::OcrFormat;

use crate::commands::ReaderArgs;

mod commands;

#[derive(Parser)]
#[command(name = "ocrhl-cmd")]
#[command(about = "Command-line utility for OCR source pointers and page indexes")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v for debug, -vv for trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    reader: ReaderArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a page index file for an OCR document
    IndexPages {
        /// Markup format (alto, hocr, miniocr); detected from the text when omitted
        #[arg(long)]
        format: Option<OcrFormat>,

        /// Source pointer of the document
        pointer: String,

        /// Output index URL or path
        out: String,
    },

    /// Find the page holding a byte offset in a page index
    Locate {
        /// Page index URL or path
        index: String,

        /// Logical byte offset
        offset: u64,
    },

    /// Print the highlighting snippet around a byte offset
    Snippet {
        /// Markup format (alto, hocr, miniocr); detected from the text when omitted
        #[arg(long)]
        format: Option<OcrFormat>,

        /// Number of lines on each side of the matched line
        #[arg(long, default_value_t = 2)]
        context: usize,

        /// Length of the match in bytes
        #[arg(long, default_value_t = 1)]
        len: u64,

        /// Page index URL or path used for the page lookup
        #[arg(long)]
        index: Option<String>,

        /// Source pointer of the document
        pointer: String,

        /// Logical byte offset of the match
        offset: u64,
    },

    /// Show the section holding a byte offset and where it lives on disk
    Sections {
        /// Source pointer of the document
        pointer: String,

        /// Logical byte offset
        offset: u64,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::IndexPages {
            format,
            pointer,
            out,
        } => commands::index_pages::run(&cli.reader, format, pointer, out),
        Commands::Locate { index, offset } => commands::locate::run(index, offset),
        Commands::Snippet {
            format,
            context,
            len,
            index,
            pointer,
            offset,
        } => {
            let match_range = offset..offset.saturating_add(len);
            commands::snippet::run(&cli.reader, format, context, index, pointer, match_range)
        }
        Commands::Sections { pointer, offset } => {
            commands::sections::run(&cli.reader, pointer, offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use ocrhl::breaks::OcrFormat;
    use ocrhl_testkit::{
        data_gen::{Dialect, DocShape, generate},
        temp,
    };

    use super::{Cli, Commands, commands};

    #[test]
    fn test_parse_snippet_args() {
        let cli = Cli::try_parse_from([
            "ocrhl-cmd",
            "-vv",
            "--section-size",
            "4096",
            "snippet",
            "--format",
            "HOCR",
            "--context",
            "5",
            "/data/a.hocr+/data/b.hocr",
            "1200",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.reader.section_size, 4096);
        assert_eq!(cli.reader.cache_sections, 10);
        let Commands::Snippet {
            format,
            context,
            len,
            index,
            offset,
            ..
        } = cli.command
        else {
            panic!("expected the snippet command");
        };
        assert_eq!(format, Some(OcrFormat::Hocr));
        assert_eq!((context, len, offset), (5, 1, 1200));
        assert!(index.is_none());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let args = ["ocrhl-cmd", "index-pages", "--format", "pdf", "a", "b"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_index_then_locate() {
        let doc = generate(Dialect::MiniOcr, &DocShape::default());
        let source = temp::write_doc(&doc).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("doc.idx").display().to_string();
        let pointer = source.path().display().to_string();
        let cli = Cli::try_parse_from(["ocrhl-cmd", "index-pages", &pointer, &out]).unwrap();

        commands::index_pages::run(&cli.reader, None, pointer.clone(), out.clone()).unwrap();
        let index = commands::open_index(&out).unwrap();
        assert_eq!(index.num_pages(), doc.pages.len());
        commands::locate::run(out, doc.words[0].start).unwrap();

        let offset = doc.words[30].start;
        commands::snippet::run(&cli.reader, None, 1, None, pointer.clone(), offset..offset + 1)
            .unwrap();
        commands::sections::run(&cli.reader, pointer, offset).unwrap();
    }
}
