use crate::resources::{LoadCompletion, ResourceData, ResourceLoader, Spawner, load_binary};

#[derive(Default)]
pub struct JsonResourceLoader;

impl ResourceLoader for JsonResourceLoader {
    fn supported_extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn load(&self, completion: LoadCompletion, spawner: &Spawner) {
        let name = completion.name().to_string();
        spawner.spawn(async move {
            let json = load_binary(&name).await.and_then(|bytes| {
                serde_json::from_slice::<serde_json::Value>(&bytes).map_err(anyhow::Error::from)
            });
            completion.complete(json.map(ResourceData::Json));
        });
    }
}
