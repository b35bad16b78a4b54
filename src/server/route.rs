/* src/server/route.rs */

use axum::http::Method;

use super::BuildError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Param(String),
}

#[derive(Debug, Clone)]
struct Route<T> {
	template: String,
	segments: Vec<Segment>,
	handlers: Vec<(Method, T)>,
}

impl<T> Route<T> {
	/// Ordering key: shorter first, then literal before parameter at the
	/// first position where two templates differ.
	fn rank(&self) -> (usize, Vec<bool>) {
		let shape = self
			.segments
			.iter()
			.map(|s| matches!(s, Segment::Param(_)))
			.collect();
		(self.segments.len(), shape)
	}

	fn capture<'p>(&self, parts: &[&'p str]) -> Option<Vec<(String, &'p str)>> {
		if parts.len() != self.segments.len() {
			return None;
		}
		let mut params = Vec::new();
		for (segment, part) in self.segments.iter().zip(parts) {
			match segment {
				Segment::Literal(lit) if lit == part => {}
				Segment::Literal(_) => return None,
				Segment::Param(_) if part.is_empty() => return None,
				Segment::Param(name) => params.push((name.clone(), *part)),
			}
		}
		Some(params)
	}
}

/// Outcome of a [`RouteTable::lookup`].
#[derive(Debug)]
pub enum Lookup<'t, 'p, T> {
	Found {
		template: &'t str,
		value: &'t T,
		params: Vec<(String, &'p str)>,
	},
	/// The path matches a template, but not with this method.
	MethodNotAllowed { allow: Vec<Method> },
	NotFound,
}

/// Path templates such as `/pets/{id}` mapped to per-method values.
///
/// Among templates matching a path, literal segments beat parameters;
/// equally specific templates keep their declaration order.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
	routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
	fn default() -> Self {
		Self { routes: Vec::new() }
	}
}

impl<T> RouteTable<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `value` for `method` on `template`.
	pub fn insert(&mut self, template: &str, method: Method, value: T) -> Result<(), BuildError> {
		let segments = parse(template)?;

		let index = match self.routes.iter().position(|r| r.template == template) {
			Some(index) => index,
			None => {
				self.routes.push(Route {
					template: template.to_string(),
					segments,
					handlers: Vec::new(),
				});
				self.routes.len() - 1
			}
		};
		let route = &mut self.routes[index];

		if route.handlers.iter().any(|(m, _)| *m == method) {
			return Err(BuildError::Route {
				template: template.to_string(),
				reason: format!("duplicate method {method}"),
			});
		}
		route.handlers.push((method, value));
		Ok(())
	}

	/// Orders routes by specificity. Call once after all inserts.
	pub fn finish(mut self) -> Self {
		self.routes.sort_by_cached_key(Route::rank);
		self
	}

	pub fn lookup<'t, 'p>(&'t self, method: &Method, path: &'p str) -> Lookup<'t, 'p, T> {
		let parts = split(path);
		let mut allow: Vec<Method> = Vec::new();

		for route in &self.routes {
			let Some(params) = route.capture(&parts) else {
				continue;
			};
			if let Some((_, value)) = route.handlers.iter().find(|(m, _)| m == method) {
				return Lookup::Found {
					template: &route.template,
					value,
					params,
				};
			}
			for (m, _) in &route.handlers {
				if !allow.contains(m) {
					allow.push(m.clone());
				}
			}
		}

		if allow.is_empty() {
			Lookup::NotFound
		} else {
			Lookup::MethodNotAllowed { allow }
		}
	}

	pub fn len(&self) -> usize {
		self.routes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	pub fn templates(&self) -> impl Iterator<Item = &str> {
		self.routes.iter().map(|r| r.template.as_str())
	}
}

fn split(path: &str) -> Vec<&str> {
	let trimmed = path.strip_prefix('/').unwrap_or(path);
	let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
	if trimmed.is_empty() {
		Vec::new()
	} else {
		trimmed.split('/').collect()
	}
}

fn parse(template: &str) -> Result<Vec<Segment>, BuildError> {
	let invalid = |reason: &str| BuildError::Route {
		template: template.to_string(),
		reason: reason.to_string(),
	};

	if !template.starts_with('/') {
		return Err(invalid("must start with '/'"));
	}

	split(template)
		.into_iter()
		.map(|part| {
			if let Some(inner) = part.strip_prefix('{') {
				let name = inner
					.strip_suffix('}')
					.filter(|n| !n.is_empty() && !n.contains(['{', '}']))
					.ok_or_else(|| invalid("malformed parameter segment"))?;
				Ok(Segment::Param(name.to_string()))
			} else if part.contains(['{', '}']) {
				Err(invalid("parameters must span a whole segment"))
			} else {
				Ok(Segment::Literal(part.to_string()))
			}
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(entries: &[(&str, Method, u32)]) -> RouteTable<u32> {
		let mut table = RouteTable::new();
		for (template, method, value) in entries {
			table.insert(template, method.clone(), *value).unwrap();
		}
		table.finish()
	}

	fn found(lookup: Lookup<'_, '_, u32>) -> Option<u32> {
		match lookup {
			Lookup::Found { value, .. } => Some(*value),
			_ => None,
		}
	}

	#[test]
	fn test_literal_beats_param() {
		let t = table(&[
			("/pets/{id}", Method::GET, 1),
			("/pets/mine", Method::GET, 2),
			("/pets", Method::GET, 3),
			("/", Method::GET, 4),
		]);
		assert_eq!(found(t.lookup(&Method::GET, "/pets/mine")), Some(2));
		assert_eq!(found(t.lookup(&Method::GET, "/pets/7")), Some(1));
		assert_eq!(found(t.lookup(&Method::GET, "/pets/")), Some(3));
		assert_eq!(found(t.lookup(&Method::GET, "/")), Some(4));
		assert!(matches!(t.lookup(&Method::GET, "/pets/7/toys"), Lookup::NotFound));
	}

	#[test]
	fn test_declaration_order_breaks_ties() {
		let t = table(&[
			("/{a}/x", Method::GET, 1),
			("/{b}/x", Method::GET, 2),
			("/{a}/{b}", Method::GET, 3),
		]);
		assert_eq!(found(t.lookup(&Method::GET, "/q/x")), Some(1));
		assert_eq!(found(t.lookup(&Method::GET, "/q/y")), Some(3));
	}

	#[test]
	fn test_params_are_captured() {
		let t = table(&[("/users/{user}/posts/{post}", Method::GET, 1)]);
		match t.lookup(&Method::GET, "/users/ann/posts/9") {
			Lookup::Found { template, params, .. } => {
				assert_eq!(template, "/users/{user}/posts/{post}");
				assert_eq!(
					params,
					vec![("user".to_string(), "ann"), ("post".to_string(), "9")]
				);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn test_method_not_allowed() {
		let t = table(&[
			("/pets/{id}", Method::GET, 1),
			("/pets/{id}", Method::DELETE, 2),
			("/pets/mine", Method::PUT, 3),
		]);
		// The literal route lacks DELETE, so the parameter route serves it.
		assert_eq!(found(t.lookup(&Method::DELETE, "/pets/mine")), Some(2));
		match t.lookup(&Method::POST, "/pets/mine") {
			Lookup::MethodNotAllowed { allow } => {
				assert_eq!(allow, vec![Method::PUT, Method::GET, Method::DELETE]);
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[test]
	fn test_rejects_bad_templates() {
		let mut t = RouteTable::new();
		assert!(t.insert("pets", Method::GET, 0).is_err());
		assert!(t.insert("/pets/{}", Method::GET, 0).is_err());
		assert!(t.insert("/pets/a{id}", Method::GET, 0).is_err());
		t.insert("/pets", Method::GET, 0).unwrap();
		assert!(matches!(
			t.insert("/pets", Method::GET, 1),
			Err(BuildError::Route { .. })
		));
	}
}
