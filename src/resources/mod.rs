/**
 * This module contains all logic for loading images and raw files from the `assets` directory.
 *
 * Natively files are read from `./assets/`; in the browser they are fetched from
 * `<origin>/assets/`.
 */
use anyhow::Context as _;

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no global window")?;
    let origin = window
        .location()
        .origin()
        .map_err(|e| anyhow::anyhow!("could not read the page origin: {:?}", e))?;
    let base = reqwest::Url::parse(&format!("{}/assets/", origin))?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        std::fs::read(&path).with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_image(file_name: &str) -> anyhow::Result<image::DynamicImage> {
    let data = load_binary(file_name).await?;
    image::load_from_memory(&data).with_context(|| format!("could not decode {}", file_name))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn missing_files_name_the_path() {
        let err = futures::executor::block_on(load_binary("does/not/exist.png")).unwrap_err();
        assert!(err.to_string().contains("exist.png"));
    }
}
