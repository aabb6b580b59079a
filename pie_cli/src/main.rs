//! pie - convert images to and from the PIE pixel art format
//!
//! `pie sprite.png sprite.pie` encodes, `pie sprite.pie sprite.png` decodes.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use image::{ImageFormat, RgbImage, RgbaImage};
use lib_pie::constants::EXTENSION;
use lib_pie::{
    decode_to_vec, encode_to_vec, encode_with_palette, max_encoded_size, DecodeError,
    EncodeOptions, EncodingError, Header, HeaderError, Palette, PaletteError, PixelFormat,
};
use log::{debug, info};
use thiserror::Error;

#[derive(Parser)]
#[command(name = "pie")]
#[command(version)]
#[command(about = "Lossless palette + RLE codec for pixel art", long_about = None)]
struct Cli {
    /// Source image; a `.pie` file is decoded, anything else is encoded
    input: PathBuf,

    /// Destination file
    output: PathBuf,

    /// Raw palette file, stride bytes per color
    #[arg(short, long)]
    palette: Option<PathBuf>,

    /// Leave the palette out of the encoded stream
    #[arg(long)]
    no_embed: bool,
}

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to access '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image error")]
    Image(#[from] image::ImageError),
    #[error("Image of {width}x{height} exceeds the 65535x65535 limit")]
    ImageTooLarge { width: u32, height: u32 },
    #[error("Decoded pixels do not fill a {width}x{height} image")]
    InvalidPixelBuffer { width: u16, height: u16 },
    #[error("Invalid palette file")]
    Palette(#[from] PaletteError),
    #[error("Invalid PIE header")]
    Header(#[from] HeaderError),
    #[error("Encoding failed")]
    Encoding(#[from] EncodingError),
    #[error("Decoding failed")]
    Decoding(#[from] DecodeError),
}

fn read(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_pie(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION))
}

fn encode_file(cli: &Cli) -> Result<usize, CliError> {
    let source = image::open(&cli.input)?;
    let format = PixelFormat::from_alpha(source.color().has_alpha());
    let (width, height) = (source.width(), source.height());
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(CliError::ImageTooLarge { width, height });
    };

    let pixels = match format {
        PixelFormat::Rgb => source.to_rgb8().into_raw(),
        PixelFormat::Rgba => source.to_rgba8().into_raw(),
    };
    info!("Loaded {}: {}x{} {:?}", cli.input.display(), w, h, format);

    let options = EncodeOptions {
        format,
        embed_palette: !cli.no_embed,
    };

    let encoded = match &cli.palette {
        Some(path) => {
            let palette = Palette::from_bytes(format, &read(path)?)?;
            debug!("Using palette {} with {} colors", path.display(), palette.len());

            let capacity = max_encoded_size(w, h, format, options.embed_palette)
                .ok_or(EncodingError::ImageTooLarge { width: w, height: h })?;
            let mut encoded = vec![0; capacity];
            let len = encode_with_palette(&pixels, w, h, &options, &palette, &mut encoded)?;
            encoded.truncate(len);
            encoded
        }
        None => {
            let encoded = encode_to_vec(&pixels, w, h, &options)?;
            if cli.no_embed {
                // Keep the generated palette next to the stream so it can be decoded again.
                let mut palette = Palette::new(format);
                palette.extend_from_pixels(&pixels)?;
                let path = cli.output.with_extension("pal");
                write(&path, palette.as_bytes())?;
                println!("Palette written to {}", path.display());
            }
            encoded
        }
    };

    write(&cli.output, &encoded)?;
    Ok(encoded.len())
}

fn decode_file(cli: &Cli, source: &[u8]) -> Result<usize, CliError> {
    let header = Header::parse(source)?;

    let palette = match &cli.palette {
        Some(path) => Some(Palette::from_bytes(header.format(), &read(path)?)?),
        None => None,
    };

    let image = decode_to_vec(source, palette.as_ref())?;
    let (width, height) = (image.width as u32, image.height as u32);
    let invalid = CliError::InvalidPixelBuffer {
        width: image.width,
        height: image.height,
    };

    match image.format {
        PixelFormat::Rgb => RgbImage::from_raw(width, height, image.pixels)
            .ok_or(invalid)?
            .save_with_format(&cli.output, ImageFormat::Png)?,
        PixelFormat::Rgba => RgbaImage::from_raw(width, height, image.pixels)
            .ok_or(invalid)?
            .save_with_format(&cli.output, ImageFormat::Png)?,
    }

    let written = fs::metadata(&cli.output)
        .map_err(|source| CliError::Io {
            path: cli.output.clone(),
            source,
        })?
        .len();
    Ok(written as usize)
}

fn main() -> Result<(), CliError> {
    lib_pie::init_logging();
    let cli = Cli::parse();

    let input_size = fs::metadata(&cli.input)
        .map_err(|source| CliError::Io {
            path: cli.input.clone(),
            source,
        })?
        .len() as usize;

    let output_size = if is_pie(&cli.input) {
        let source = read(&cli.input)?;
        decode_file(&cli, &source)?
    } else {
        encode_file(&cli)?
    };

    println!("Success. {}B -> {}B", input_size, output_size);
    if output_size > input_size {
        println!("Warning: output is larger than input");
    }

    Ok(())
}
