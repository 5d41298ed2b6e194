use std::any::Any;
use std::sync::Arc;
use view_helpers::prelude::*;

struct HtmlHelper {
    config: Config,
}

impl Helper for HtmlHelper {
    fn name(&self) -> &str {
        "Html"
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn implemented_events(&self) -> Vec<String> {
        vec!["View.beforeRender".to_string()]
    }

    fn handle_event(&self, event: &EventWrapper) -> Result<()> {
        if let Some(ViewEvent::BeforeRender { view_file }) = event.downcast::<ViewEvent>() {
            println!("Html helper preparing {}", view_file);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl ConstructHelper for HtmlHelper {
    fn construct(_view: &View, config: Config) -> Result<Self> {
        Ok(Self { config })
    }
}

register_helper!(HtmlHelper, "Html");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let app = App::build()
        .add_plugin_helper("Blog", "Comment", |_view: &View, config: Config| -> Result<Arc<dyn Helper>> {
            Ok(Arc::new(FunctionHelper::new("Comment", config, |_| Ok(()))))
        })
        .build()?;
    app.start().await?;

    let view = app.plugin_view("Articles/view", "Blog");
    let mut helpers = app.helpers(&view);

    for name in ["Html", "Comment", "Nonexistent"] {
        match helpers.get(name) {
            Ok(Some(helper)) => println!("{} -> {}", name, helper.name()),
            Ok(None) => println!("{} -> (absent)", name),
            Err(e) => println!("{} -> {}", name, e),
        }
    }

    view.dispatch(ViewEvent::BeforeRender { view_file: "Articles/view".into() })?;
    app.shutdown().await?;

    Ok(())
}
