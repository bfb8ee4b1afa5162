use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// Serializes a value to JSON and uploads it to an S3 bucket with `application/json` content type.
pub async fn write_json_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    value: &impl Serialize,
) -> Result<()> {
    let body = serde_json::to_vec(value)?;

    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(body.into())
        .content_type("application/json")
        .send()
        .await?;

    info!(bucket, key, "JSON uploaded to S3");
    Ok(())
}

/// Uploads a report file, gzip-compressed under `<key>.gz` when `gzip` is set.
/// Returns the key written.
pub async fn write_file_to_s3(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    contents: Vec<u8>,
    content_type: &str,
    gzip: bool,
) -> Result<String> {
    let (body, key) = if gzip {
        (gzip_bytes(&contents)?, format!("{key}.gz"))
    } else {
        (contents, key.to_string())
    };

    let mut request = client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(body))
        .content_type(content_type);
    if gzip {
        request = request.content_encoding("gzip");
    }
    request.send().await?;

    info!(bucket, key = %key, gzip, "File uploaded to S3");
    Ok(key)
}

pub fn gzip_bytes(contents: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_gzip_bytes_decompresses_to_input() {
        let input = b"Ordem,Logradouro\n1,\"Rua Aurora, 50\"\n";
        let compressed = gzip_bytes(input).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, input);
    }
}
