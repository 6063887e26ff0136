//! Translation of shrink options into the engine's argument grammar.
//!
//! The argument list is a wire contract with the engine: spelling and order
//! must be reproduced exactly. Note the absence of a quiet flag: progress
//! inference depends on the engine's page log lines.

use crate::options::ShrinkOptions;

/// Build the complete engine argument list for one invocation.
///
/// Deterministic for identical inputs; performs no I/O and cannot fail.
/// Numeric fields must already have passed [`ShrinkOptions::sanitized`].
/// The output path argument comes before the positional input path, which
/// is always last.
pub fn build_engine_args(
    options: &ShrinkOptions,
    pdf_version: &str,
    output_path: &str,
    input_path: &str,
) -> Vec<String> {
    let dpi = options.resolution_dpi;
    let threshold = options.downsample_threshold;

    let mut args = vec![
        "-dBATCH".to_string(),
        "-dNOPAUSE".to_string(),
        "-dSAFER".to_string(),
        "-sDEVICE=pdfwrite".to_string(),
        format!("-dCompatibilityLevel={pdf_version}"),
        format!("-dPDFSETTINGS=/{}", options.preset.as_ref()),
        "-dPreserveAnnots=false".to_string(),
        "-dEmbedAllFonts=true".to_string(),
        "-dSubsetFonts=true".to_string(),
        "-dAutoRotatePages=/None".to_string(),
    ];

    // Color and grayscale images share resolution and threshold with
    // bicubic resampling; monochrome images subsample instead.
    for class in ["Color", "Gray"] {
        args.push(format!("-d{class}ImageDownsampleType=/Bicubic"));
        args.push(format!("-d{class}ImageResolution={dpi}"));
        args.push(format!("-d{class}ImageDownsampleThreshold={threshold}"));
    }
    args.push("-dMonoImageDownsampleType=/Subsample".to_string());
    args.push(format!("-dMonoImageResolution={dpi}"));
    args.push(format!("-dMonoImageDownsampleThreshold={threshold}"));

    if options.grayscale {
        args.push("-sProcessColorModel=DeviceGray".to_string());
        args.push("-sColorConversionStrategy=Gray".to_string());
        args.push("-dOverrideICC".to_string());
    }

    args.push(format!("-sOutputFile={output_path}"));
    args.push(input_path.to_string());
    args
}
