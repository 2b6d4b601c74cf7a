use hyper::http::request::Parts;

use super::{Director, DirectorError};

/// 디렉터 체인
///
/// 구성된 순서대로 디렉터를 실행하고 첫 번째 에러에서 멈춥니다.
/// 앞선 디렉터가 만든 변경은 되돌리지 않습니다.
#[derive(Default)]
pub struct DirectorChain {
    directors: Vec<Box<dyn Director>>,
}

impl DirectorChain {
    /// 없는(`None`) 단계는 건너뛰고 나머지 순서를 그대로 유지합니다.
    pub fn new<I>(directors: I) -> Self
    where
        I: IntoIterator<Item = Option<Box<dyn Director>>>,
    {
        Self {
            directors: directors.into_iter().flatten().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.directors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directors.is_empty()
    }
}

impl Director for DirectorChain {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        for director in &self.directors {
            director.direct(parts)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DirectorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorChain")
            .field("len", &self.directors.len())
            .finish()
    }
}
