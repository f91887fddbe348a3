use std::path::PathBuf;

const SCALAR_JS: &str = "https://cdn.jsdelivr.net/npm/@scalar/api-reference";

fn default_theme() -> String {
	"default".into()
}

fn default_spec_url() -> String {
	"/docs/private/api.json".into()
}

#[derive(serde::Deserialize)]
struct Manifest {
	package: Package,
}

#[derive(serde::Deserialize)]
struct Package {
	metadata: Metadata,
}

#[derive(serde::Deserialize)]
struct Metadata {
	scalar: Scalar,
}

#[derive(serde::Deserialize)]
struct Scalar {
	#[serde(default = "default_theme")]
	theme: String,
	#[serde(default = "default_spec_url")]
	spec_url: String,
	title: String,
}

// Renders the API reference page from `[package.metadata.scalar]`.
fn main() {
	println!("cargo:rerun-if-changed=Cargo.toml");
	println!("cargo:rerun-if-changed=migrations");

	let manifest = std::fs::read_to_string("Cargo.toml").unwrap();
	let scalar = toml::from_str::<Manifest>(&manifest)
		.unwrap()
		.package
		.metadata
		.scalar;

	let out = PathBuf::from(std::env::var("OUT_DIR").unwrap());

	let html = format!(
		r#"<!DOCTYPE html>
		<html>
			<head>
				<title>{title}</title>
				<meta charset="utf-8" />
				<meta
					name="viewport"
					content="width=device-width, initial-scale=1" />
				<style>
					body {{
						margin: 0;
					}}
				</style>
			</head>
			<body>
				<script
					id="api-reference"
					data-url="{spec_url}"></script>
				<script>
					var configuration = {{
						theme: '{theme}',
					}}

					document.getElementById('api-reference').dataset.configuration =
						JSON.stringify(configuration)
				</script>
				<script src="{js}"></script>
			</body>
		</html>"#,
		title = scalar.title,
		theme = scalar.theme,
		spec_url = scalar.spec_url,
		js = SCALAR_JS,
	);

	std::fs::write(out.join("scalar.html"), html).unwrap();
}
