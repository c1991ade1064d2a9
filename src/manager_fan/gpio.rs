use std::fs;
use std::io;
use std::path::PathBuf;
use crate::errors::ActuatorError;

/// Two state digital output
pub trait OutputPin {
    fn set(&mut self, high: bool) -> Result<(), ActuatorError>;

    /// Gives the pin back to the system
    fn release(&mut self) -> Result<(), ActuatorError>;
}

/// GPIO output through the sysfs gpio interface
pub struct SysfsPin {
    root: PathBuf,
    pin: u32,
}

impl SysfsPin {
    /// Exports the pin and configures it as an output driven low
    ///
    /// # Arguments
    ///
    /// * 'root' - the gpio class directory, normally /sys/class/gpio
    /// * 'pin' - the BCM pin number
    pub fn open(root: &str, pin: u32) -> Result<Self, ActuatorError> {
        let root = PathBuf::from(root);
        let pin_dir = root.join(format!("gpio{}", pin));

        if !pin_dir.exists() {
            match fs::write(root.join("export"), pin.to_string()) {
                Ok(()) => {},
                // EBUSY, someone exported it before us
                Err(e) if e.raw_os_error() == Some(16) => {},
                Err(e) => return Err(e.into()),
            }
        }

        // "low" sets direction out with the level already low, so the fan never blips on
        fs::write(pin_dir.join("direction"), "low")?;

        Ok(Self { root, pin })
    }

    fn value_path(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin)).join("value")
    }
}

impl OutputPin for SysfsPin {
    fn set(&mut self, high: bool) -> Result<(), ActuatorError> {
        fs::write(self.value_path(), if high { "1" } else { "0" })?;
        Ok(())
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        match fs::write(self.root.join("unexport"), self.pin.to_string()) {
            Ok(()) => Ok(()),
            // EINVAL, already unexported
            Err(e) if e.raw_os_error() == Some(22) || e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::TempDir;

    #[test]
    fn drives_value_file() {
        let dir = TempDir::new("gpio");
        let pin_dir = dir.path().join("gpio4");
        fs::create_dir_all(&pin_dir).unwrap();

        let mut pin = SysfsPin::open(dir.path().to_str().unwrap(), 4).unwrap();
        assert_eq!(fs::read_to_string(pin_dir.join("direction")).unwrap(), "low");

        pin.set(true).unwrap();
        assert_eq!(fs::read_to_string(pin_dir.join("value")).unwrap(), "1");
        pin.set(false).unwrap();
        assert_eq!(fs::read_to_string(pin_dir.join("value")).unwrap(), "0");

        pin.release().unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("unexport")).unwrap(), "4");
    }
}
