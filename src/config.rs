use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use crate::render::Rgb;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionThresholds {
    /// Per-pixel absolute difference above which a pixel counts as foreground.
    pub diff_threshold: u8,
    pub motion_threshold: f64,
    pub rolling_motion_threshold: f64,
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            diff_threshold: 25,
            motion_threshold: 5000.0,
            rolling_motion_threshold: 10000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GestureTuning {
    pub knead_cooldown_secs: f64,
    pub kneads_required: u32,
    pub rolling_speed_factor: f64,
}

impl Default for GestureTuning {
    fn default() -> Self {
        Self {
            knead_cooldown_secs: 1.0,
            kneads_required: 5,
            rolling_speed_factor: 0.005,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DoughSettings {
    pub base_radius: f64,
    pub max_radius: f64,
    pub min_radius: f64,
    pub knead_shrink_step: f64,
    pub cook_duration_secs: f64,
    pub raw_color: Rgb,
    pub cooked_color: Rgb,
}

impl Default for DoughSettings {
    fn default() -> Self {
        Self {
            base_radius: 50.0,
            max_radius: 120.0,
            min_radius: 5.0,
            knead_shrink_step: 3.0,
            cook_duration_secs: 3.0,
            raw_color: Rgb([254, 235, 195]),
            cooked_color: Rgb([200, 160, 100]),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub motion: MotionThresholds,
    #[serde(default)]
    pub gestures: GestureTuning,
    #[serde(default)]
    pub dough: DoughSettings,
}

impl Profile {
    pub fn from_toml(txt: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    /// Load an explicit profile file, bypassing the active pointer.
    pub fn load_file(path: &Path) -> Result<Self> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Self::from_toml(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("chappathi"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(config_dir()?)
    }

    pub fn load_or_install_in(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            let mut f = fs::File::create(&active_ptr)?;
            f.write_all(b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Profile::load_file(&profdir.join(format!("{active_name}.toml")))?;

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        let p = self.profiles_dir.join(format!("{name}.toml"));
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        // refuse to point at a profile that does not validate
        let profile = Profile::load_file(&p)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        self.profile = profile;
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }

    pub fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "config_dir": self.config_dir,
            "profiles_dir": self.profiles_dir,
            "active_profile": self.active_name,
            "profile": self.profile,
        })
    }
}

pub fn validate_profile(p: &Profile) -> Result<()> {
    let numbers = [
        ("motion.motion_threshold", p.motion.motion_threshold),
        ("motion.rolling_motion_threshold", p.motion.rolling_motion_threshold),
        ("gestures.knead_cooldown_secs", p.gestures.knead_cooldown_secs),
        ("gestures.rolling_speed_factor", p.gestures.rolling_speed_factor),
        ("dough.base_radius", p.dough.base_radius),
        ("dough.max_radius", p.dough.max_radius),
        ("dough.min_radius", p.dough.min_radius),
        ("dough.knead_shrink_step", p.dough.knead_shrink_step),
        ("dough.cook_duration_secs", p.dough.cook_duration_secs),
    ];
    if let Some((key, _)) = numbers.iter().find(|(_, v)| !v.is_finite()) {
        return Err(anyhow!("{key} must be a finite number"));
    }

    let m = &p.motion;
    if m.motion_threshold <= 0.0 || m.rolling_motion_threshold <= 0.0 {
        return Err(anyhow!("motion thresholds must be positive"));
    }
    if m.rolling_motion_threshold < m.motion_threshold {
        return Err(anyhow!(
            "motion.rolling_motion_threshold must not be below motion.motion_threshold"
        ));
    }

    let g = &p.gestures;
    if g.knead_cooldown_secs < 0.0 {
        return Err(anyhow!("gestures.knead_cooldown_secs must not be negative"));
    }
    if g.kneads_required == 0 {
        return Err(anyhow!("gestures.kneads_required must be at least 1"));
    }
    if g.rolling_speed_factor <= 0.0 {
        return Err(anyhow!("gestures.rolling_speed_factor must be positive"));
    }

    let d = &p.dough;
    if d.min_radius <= 0.0 {
        return Err(anyhow!("dough.min_radius must be positive"));
    }
    if !(d.min_radius < d.base_radius && d.base_radius <= d.max_radius) {
        return Err(anyhow!(
            "dough radii must satisfy min_radius < base_radius <= max_radius"
        ));
    }
    if d.knead_shrink_step < 0.0 {
        return Err(anyhow!("dough.knead_shrink_step must not be negative"));
    }
    if d.cook_duration_secs <= 0.0 {
        return Err(anyhow!("dough.cook_duration_secs must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_default_profile_matches_builtin_defaults() {
        let p = Profile::from_toml(default_profile_text()).unwrap();
        let d = Profile::default();
        assert_eq!(p.meta.name.as_deref(), Some("default"));
        assert_eq!(p.motion.diff_threshold, d.motion.diff_threshold);
        assert_eq!(p.motion.motion_threshold, d.motion.motion_threshold);
        assert_eq!(p.gestures.kneads_required, d.gestures.kneads_required);
        assert_eq!(p.dough.max_radius, d.dough.max_radius);
        assert_eq!(p.dough.raw_color, d.dough.raw_color);
        assert_eq!(p.dough.cooked_color, d.dough.cooked_color);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let p = Profile::from_toml("[gestures]\nknead_cooldown_secs = 0.5\n").unwrap();
        assert_eq!(p.gestures.knead_cooldown_secs, 0.5);
        assert_eq!(p.gestures.kneads_required, 5);
        assert_eq!(p.motion.rolling_motion_threshold, 10000.0);
    }

    #[test]
    fn rejects_inverted_radii() {
        let err = Profile::from_toml("[dough]\nbase_radius = 200.0\n").unwrap_err();
        assert!(err.to_string().contains("radii"));
    }

    #[test]
    fn rejects_non_finite_numbers() {
        let err = Profile::from_toml("[dough]\ncook_duration_secs = nan\n").unwrap_err();
        assert!(err.to_string().contains("cook_duration_secs"));
        assert!(Profile::from_toml("[gestures]\nknead_cooldown_secs = inf\n").is_err());
        assert!(Profile::from_toml("[motion]\nrolling_motion_threshold = inf\n").is_err());
    }

    #[test]
    fn rejects_rolling_threshold_below_detection() {
        let txt = "[motion]\nmotion_threshold = 8000.0\nrolling_motion_threshold = 4000.0\n";
        assert!(Profile::from_toml(txt).is_err());
    }

    #[test]
    fn installs_default_and_switches_profiles() {
        let dir = std::env::temp_dir().join(format!("chappathi-cfg-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let mut st = ConfigState::load_or_install_in(dir.clone()).unwrap();
        assert_eq!(st.active_name, "default");
        assert_eq!(st.list_profiles(), vec!["default".to_string()]);

        fs::write(
            st.profiles_dir.join("quick.toml"),
            "[meta]\nname = \"quick\"\n[dough]\ncook_duration_secs = 1.0\n",
        )
        .unwrap();
        st.set_active("quick").unwrap();
        assert_eq!(st.profile.dough.cook_duration_secs, 1.0);
        assert!(st.set_active("missing").is_err());

        let reloaded = ConfigState::load_or_install_in(dir.clone()).unwrap();
        assert_eq!(reloaded.active_name, "quick");

        let _ = fs::remove_dir_all(&dir);
    }
}
